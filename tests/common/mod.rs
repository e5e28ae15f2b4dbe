//! 测试用的内存标签页宿主
//!
//! 每个标签页的行为由 `Behavior` 描述：多久之后 URL 变成 `?tab=review`、
//! 第几次探测开始出现评分、用户多久之后手动关闭。

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use review_all_games::error::{AppError, AppResult};
use review_all_games::infrastructure::{EventDispatcher, SpawnedWorker, WorkerHost};
use review_all_games::{JobTarget, WorkerId};
use serde_json::{json, Value as JsonValue};

/// 单个标签页的脚本化行为
#[derive(Debug, Clone, Default)]
pub struct Behavior {
    /// 创建后多久 URL 变为 `?tab=review`
    pub review_after: Option<Duration>,
    /// 从第几次探测开始返回评分
    pub rating_from_attempt: Option<usize>,
    /// 创建后多久被用户关闭
    pub user_closes_after: Option<Duration>,
}

impl Behavior {
    /// 不自动发生任何事，由测试手动驱动
    pub fn manual() -> Self {
        Self::default()
    }

    /// 分析 `after` 后完成，第 `attempt` 次探测出现评分
    pub fn reviewed(after: Duration, attempt: usize) -> Self {
        Self {
            review_after: Some(after),
            rating_from_attempt: Some(attempt),
            user_closes_after: None,
        }
    }

    pub fn closed_by_user(after: Duration) -> Self {
        Self {
            user_closes_after: Some(after),
            ..Self::default()
        }
    }
}

#[derive(Default)]
struct State {
    next_id: usize,
    spawned: Vec<(WorkerId, JobTarget)>,
    live: HashMap<WorkerId, Behavior>,
    peak_live: usize,
    probe_calls: HashMap<WorkerId, usize>,
    destroyed: Vec<WorkerId>,
    destroy_calls: usize,
}

struct Inner {
    dispatcher: EventDispatcher,
    state: Mutex<State>,
}

impl Inner {
    fn remove_live(&self, id: &WorkerId) -> bool {
        let removed = self.state.lock().unwrap().live.remove(id).is_some();
        if removed {
            self.dispatcher.dispatch_removed(id);
        }
        removed
    }
}

pub struct MockHost {
    inner: Arc<Inner>,
    behavior: Box<dyn Fn(&JobTarget) -> Behavior + Send + Sync>,
    fail_spawn_at: Option<usize>,
}

impl MockHost {
    pub fn new(behavior: impl Fn(&JobTarget) -> Behavior + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                dispatcher: EventDispatcher::new(),
                state: Mutex::new(State::default()),
            }),
            behavior: Box::new(behavior),
            fail_spawn_at: None,
        }
    }

    /// 第 `n` 次（从 1 开始）创建标签页时失败
    pub fn failing_spawn_at(mut self, n: usize) -> Self {
        self.fail_spawn_at = Some(n);
        self
    }

    /// 模拟标签页 URL 变化
    pub fn navigate(&self, id: &WorkerId, url: &str) -> bool {
        self.inner.dispatcher.dispatch_updated(id, url)
    }

    /// 模拟用户关闭标签页
    pub fn close_by_user(&self, id: &WorkerId) -> bool {
        self.inner.remove_live(id)
    }

    pub fn set_rating_from(&self, id: &WorkerId, attempt: Option<usize>) {
        let mut state = self.inner.state.lock().unwrap();
        if let Some(behavior) = state.live.get_mut(id) {
            behavior.rating_from_attempt = attempt;
        }
    }

    pub fn spawned_targets(&self) -> Vec<JobTarget> {
        let state = self.inner.state.lock().unwrap();
        state.spawned.iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn spawned_ids(&self) -> Vec<WorkerId> {
        let state = self.inner.state.lock().unwrap();
        state.spawned.iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn destroyed(&self) -> Vec<WorkerId> {
        self.inner.state.lock().unwrap().destroyed.clone()
    }

    pub fn destroy_calls(&self) -> usize {
        self.inner.state.lock().unwrap().destroy_calls
    }

    pub fn probe_calls(&self, id: &WorkerId) -> usize {
        let state = self.inner.state.lock().unwrap();
        state.probe_calls.get(id).copied().unwrap_or(0)
    }

    pub fn is_live(&self, id: &WorkerId) -> bool {
        self.inner.state.lock().unwrap().live.contains_key(id)
    }

    pub fn peak_live(&self) -> usize {
        self.inner.state.lock().unwrap().peak_live
    }

    pub fn is_observed(&self, id: &WorkerId) -> bool {
        self.inner.dispatcher.is_observed(id)
    }
}

#[async_trait]
impl WorkerHost for MockHost {
    async fn spawn_worker(&self, target: &JobTarget) -> AppResult<SpawnedWorker> {
        let behavior = (self.behavior)(target);

        let id = {
            let mut state = self.inner.state.lock().unwrap();
            state.next_id += 1;
            if Some(state.next_id) == self.fail_spawn_at {
                return Err(AppError::worker_spawn_failed(target.as_str(), "mock spawn failure"));
            }

            let id = WorkerId::new(format!("tab-{}", state.next_id));
            state.spawned.push((id.clone(), target.clone()));
            state.live.insert(id.clone(), behavior.clone());
            state.peak_live = state.peak_live.max(state.live.len());
            id
        };
        let observers = self.inner.dispatcher.register(&id);

        if let Some(after) = behavior.review_after {
            let inner = self.inner.clone();
            let id = id.clone();
            let url = target.to_string();
            tokio::spawn(async move {
                inner
                    .dispatcher
                    .dispatch_updated(&id, format!("{}?tab=analysis", url));
                tokio::time::sleep(after).await;
                inner
                    .dispatcher
                    .dispatch_updated(&id, format!("{}?tab=review", url));
            });
        }

        if let Some(after) = behavior.user_closes_after {
            let inner = self.inner.clone();
            let id = id.clone();
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                inner.remove_live(&id);
            });
        }

        Ok(SpawnedWorker { id, observers })
    }

    async fn destroy_worker(&self, id: &WorkerId) -> AppResult<()> {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.destroy_calls += 1;
            if state.live.contains_key(id) {
                state.destroyed.push(id.clone());
            }
        }
        // 和浏览器一样，关闭后会发出移除事件
        self.inner.remove_live(id);
        Ok(())
    }

    async fn inspect(&self, id: &WorkerId, _script: &str) -> AppResult<JsonValue> {
        let mut state = self.inner.state.lock().unwrap();
        let rating_from = match state.live.get(id) {
            Some(behavior) => behavior.rating_from_attempt,
            None => return Err(AppError::WorkerGone(id.to_string())),
        };

        let calls = state.probe_calls.entry(id.clone()).or_insert(0);
        *calls += 1;

        let text = match rating_from {
            Some(from) if *calls >= from => "87.5",
            _ => "",
        };
        Ok(json!({ "text": text }))
    }

    fn unobserve_updates(&self, id: &WorkerId) {
        self.inner.dispatcher.unobserve_updates(id);
    }

    fn unobserve_removal(&self, id: &WorkerId) {
        self.inner.dispatcher.unobserve_removal(id);
    }
}
