//! 基于 chromiumoxide 的工作页宿主
//!
//! 每个工作页是一个浏览器标签页（CDP target），标签页事件由一个后台任务
//! 统一接收，再通过 `EventDispatcher` 分发给对应的工作页。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::cdp::browser_protocol::target::{
    EventTargetCrashed, EventTargetDestroyed, EventTargetInfoChanged,
};
use chromiumoxide::{Browser, Page};
use futures::{Stream, StreamExt};
use serde_json::Value as JsonValue;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::event_dispatch::EventDispatcher;
use crate::infrastructure::worker_host::{SpawnedWorker, WorkerHost};
use crate::infrastructure::JsExecutor;
use crate::models::{JobTarget, WorkerId};

type WorkerTable<P> = Arc<Mutex<HashMap<WorkerId, P>>>;
type PageTable = WorkerTable<Page>;

fn lock_pages<P>(pages: &WorkerTable<P>) -> MutexGuard<'_, HashMap<WorkerId, P>> {
    pages.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Chrome 工作页宿主
pub struct ChromeHost {
    browser: Browser,
    pages: PageTable,
    dispatcher: Arc<EventDispatcher>,
    event_pump: JoinHandle<()>,
}

impl ChromeHost {
    /// 订阅标签页事件并启动后台分发任务
    pub async fn new(browser: Browser) -> AppResult<Self> {
        let info_changed = browser.event_listener::<EventTargetInfoChanged>().await?;
        let destroyed = browser.event_listener::<EventTargetDestroyed>().await?;
        let crashed = browser.event_listener::<EventTargetCrashed>().await?;

        let pages: PageTable = Arc::new(Mutex::new(HashMap::new()));
        let dispatcher = Arc::new(EventDispatcher::new());

        let event_pump = tokio::spawn(pump_target_events(
            info_changed,
            destroyed,
            crashed,
            pages.clone(),
            dispatcher.clone(),
        ));
        debug!("标签页事件分发任务已启动");

        Ok(Self {
            browser,
            pages,
            dispatcher,
            event_pump,
        })
    }

    /// 当前由宿主持有的工作页数量
    pub fn live_workers(&self) -> usize {
        lock_pages(&self.pages).len()
    }

    fn page(&self, id: &WorkerId) -> AppResult<Page> {
        lock_pages(&self.pages)
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::WorkerGone(id.to_string()))
    }

    /// 创建失败时撤销已经做过的注册
    async fn rollback_spawn(&self, id: &WorkerId) {
        self.dispatcher.unobserve_updates(id);
        self.dispatcher.unobserve_removal(id);
        let page = lock_pages(&self.pages).remove(id);
        if let Some(page) = page {
            if let Err(e) = page.close().await {
                debug!("回滚时关闭标签页失败: {}", e);
            }
        }
    }
}

impl Drop for ChromeHost {
    fn drop(&mut self) {
        self.event_pump.abort();
    }
}

#[async_trait]
impl WorkerHost for ChromeHost {
    async fn spawn_worker(&self, target: &JobTarget) -> AppResult<SpawnedWorker> {
        // 先开空白页并注册观察者，再导航，避免漏掉 URL 变化
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::worker_spawn_failed(target.as_str(), e))?;

        let id = WorkerId::new(page.target_id().inner().clone());
        let observers = self.dispatcher.register(&id);
        lock_pages(&self.pages).insert(id.clone(), page.clone());

        if let Err(e) = page.execute(NavigateParams::new(target.as_str())).await {
            self.rollback_spawn(&id).await;
            return Err(AppError::worker_spawn_failed(target.as_str(), e));
        }

        Ok(SpawnedWorker { id, observers })
    }

    async fn destroy_worker(&self, id: &WorkerId) -> AppResult<()> {
        let page = lock_pages(&self.pages).remove(id);
        match page {
            Some(page) => {
                page.close().await?;
                debug!("已关闭标签页 {}", id);
                Ok(())
            }
            None => {
                debug!("标签页 {} 已不存在，跳过关闭", id);
                Ok(())
            }
        }
    }

    async fn inspect(&self, id: &WorkerId, script: &str) -> AppResult<JsonValue> {
        let executor = JsExecutor::new(self.page(id)?);
        executor.eval(script).await
    }

    fn unobserve_updates(&self, id: &WorkerId) {
        self.dispatcher.unobserve_updates(id);
    }

    fn unobserve_removal(&self, id: &WorkerId) {
        self.dispatcher.unobserve_removal(id);
    }
}

/// 标签页事件路由
///
/// 只处理宿主表里登记过的工作页，其他标签页（比如对局列表页）的事件直接忽略。
struct TargetEventRouter<P> {
    pages: WorkerTable<P>,
    dispatcher: Arc<EventDispatcher>,
    last_urls: HashMap<WorkerId, String>,
}

impl<P> TargetEventRouter<P> {
    fn new(pages: WorkerTable<P>, dispatcher: Arc<EventDispatcher>) -> Self {
        Self {
            pages,
            dispatcher,
            last_urls: HashMap::new(),
        }
    }

    /// `targetInfoChanged` 在标题等变化时也会触发，只有 URL 真正变化才转发
    fn url_changed(&mut self, id: &WorkerId, url: &str) -> bool {
        if !lock_pages(&self.pages).contains_key(id) {
            return false;
        }
        if self.last_urls.get(id).map(String::as_str) == Some(url) {
            return false;
        }
        self.last_urls.insert(id.clone(), url.to_string());
        self.dispatcher.dispatch_updated(id, url)
    }

    /// 标签页关闭或崩溃，从宿主表移除并通知一次
    fn target_gone(&mut self, id: &WorkerId) -> bool {
        self.last_urls.remove(id);
        let known = lock_pages(&self.pages).remove(id).is_some();
        let notified = self.dispatcher.dispatch_removed(id);
        known && notified
    }
}

/// 把浏览器的全局标签页事件转成按工作页分发的事件
async fn pump_target_events<P>(
    mut info_changed: impl Stream<Item = Arc<EventTargetInfoChanged>> + Unpin,
    mut destroyed: impl Stream<Item = Arc<EventTargetDestroyed>> + Unpin,
    mut crashed: impl Stream<Item = Arc<EventTargetCrashed>> + Unpin,
    pages: WorkerTable<P>,
    dispatcher: Arc<EventDispatcher>,
) {
    let mut router = TargetEventRouter::new(pages, dispatcher);

    loop {
        tokio::select! {
            Some(event) = info_changed.next() => {
                let id = WorkerId::new(event.target_info.target_id.inner().clone());
                if router.url_changed(&id, &event.target_info.url) {
                    debug!("标签页 {} URL 变化: {}", id, event.target_info.url);
                }
            }
            Some(event) = destroyed.next() => {
                let id = WorkerId::new(event.target_id.inner().clone());
                if router.target_gone(&id) {
                    debug!("标签页 {} 已关闭", id);
                }
            }
            Some(event) = crashed.next() => {
                let id = WorkerId::new(event.target_id.inner().clone());
                if router.target_gone(&id) {
                    warn!("标签页 {} 崩溃 (status: {})", id, event.status);
                }
            }
            else => {
                info!("浏览器事件流已结束");
                break;
            }
        }
    }
}
