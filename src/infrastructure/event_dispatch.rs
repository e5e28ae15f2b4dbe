//! 工作页事件分发表
//!
//! 浏览器的标签页事件是全局的，这里按 `WorkerId` 建一张分发表，
//! 每个工作页各自持有自己的观察者，回调里不再需要手动过滤。

use crate::models::WorkerId;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

/// 单个工作页的观察者（接收端）
///
/// - `updates`: 每次 URL 变化收到新的 URL
/// - `removed`: 工作页被关闭（任何原因）时触发一次
#[derive(Debug)]
pub struct WorkerObservers {
    pub updates: mpsc::UnboundedReceiver<String>,
    pub removed: oneshot::Receiver<()>,
}

#[derive(Debug, Default)]
struct ObserverSlots {
    on_updated: Option<mpsc::UnboundedSender<String>>,
    on_removed: Option<oneshot::Sender<()>>,
}

impl ObserverSlots {
    fn is_empty(&self) -> bool {
        self.on_updated.is_none() && self.on_removed.is_none()
    }
}

/// 按工作页分发事件
///
/// 所有操作对未知 id 都是空操作，重复注销不会报错。
#[derive(Debug, Default)]
pub struct EventDispatcher {
    table: Mutex<HashMap<WorkerId, ObserverSlots>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<WorkerId, ObserverSlots>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 为工作页注册两个观察者，已有的注册会被替换
    pub fn register(&self, id: &WorkerId) -> WorkerObservers {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let (removed_tx, removed_rx) = oneshot::channel();

        self.table().insert(
            id.clone(),
            ObserverSlots {
                on_updated: Some(update_tx),
                on_removed: Some(removed_tx),
            },
        );
        trace!("注册观察者: {}", id);

        WorkerObservers {
            updates: update_rx,
            removed: removed_rx,
        }
    }

    /// 分发 URL 变化，返回是否有观察者收到
    pub fn dispatch_updated(&self, id: &WorkerId, url: impl Into<String>) -> bool {
        let mut table = self.table();
        let Some(slots) = table.get_mut(id) else {
            return false;
        };
        let Some(sender) = slots.on_updated.as_ref() else {
            return false;
        };

        if sender.send(url.into()).is_ok() {
            return true;
        }

        // 接收端已经丢弃
        slots.on_updated = None;
        if slots.is_empty() {
            table.remove(id);
        }
        false
    }

    /// 分发移除事件，返回是否有观察者收到
    ///
    /// 工作页移除后不会再有 URL 变化，整条记录一起删除。
    pub fn dispatch_removed(&self, id: &WorkerId) -> bool {
        let slots = self.table().remove(id);
        match slots.and_then(|s| s.on_removed) {
            Some(sender) => sender.send(()).is_ok(),
            None => false,
        }
    }

    /// 注销 URL 变化观察者
    pub fn unobserve_updates(&self, id: &WorkerId) {
        let mut table = self.table();
        if let Some(slots) = table.get_mut(id) {
            slots.on_updated = None;
            if slots.is_empty() {
                table.remove(id);
            }
        }
    }

    /// 注销移除观察者
    pub fn unobserve_removal(&self, id: &WorkerId) {
        let mut table = self.table();
        if let Some(slots) = table.get_mut(id) {
            slots.on_removed = None;
            if slots.is_empty() {
                table.remove(id);
            }
        }
    }

    /// 工作页是否还有任何观察者
    pub fn is_observed(&self, id: &WorkerId) -> bool {
        self.table().contains_key(id)
    }

    /// 当前有观察者的工作页数量
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }
}
