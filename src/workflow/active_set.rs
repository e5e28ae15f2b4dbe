//! 活跃工作页集合
//!
//! 由批处理协调器持有，控制器通过 `Arc` 共享。
//! 一个 id 在集合里，当且仅当它的控制器还没确认完成或移除。

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::futures::Notified;
use tokio::sync::Notify;

use crate::models::WorkerId;

#[derive(Debug, Default)]
pub struct ActiveWorkerSet {
    ids: Mutex<HashSet<WorkerId>>,
    drained: Notify,
}

impl ActiveWorkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn ids(&self) -> MutexGuard<'_, HashSet<WorkerId>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 登记新建的工作页
    pub fn insert(&self, id: WorkerId) -> bool {
        self.ids().insert(id)
    }

    /// 移除工作页，重复移除返回 false；集合清空时唤醒等待者
    pub fn remove(&self, id: &WorkerId) -> bool {
        let mut ids = self.ids();
        let removed = ids.remove(id);
        if removed && ids.is_empty() {
            self.drained.notify_waiters();
        }
        removed
    }

    pub fn contains(&self, id: &WorkerId) -> bool {
        self.ids().contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }

    /// 集合被清空时完成的通知
    ///
    /// 需要在检查 `len()` 之前创建，才不会错过通知。
    pub fn drained(&self) -> Notified<'_> {
        self.drained.notified()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_is_idempotent() {
        let set = ActiveWorkerSet::new();
        let id = WorkerId::new("A");

        assert!(set.insert(id.clone()));
        assert!(set.contains(&id));
        assert!(set.remove(&id));
        assert!(!set.remove(&id));
        assert!(set.is_empty());
        assert!(!set.remove(&WorkerId::new("never-added")));
    }

    #[tokio::test]
    async fn test_drained_fires_when_last_worker_leaves() {
        let set = ActiveWorkerSet::new();
        set.insert(WorkerId::new("A"));
        set.insert(WorkerId::new("B"));

        let mut drained = tokio_test::task::spawn(set.drained());
        tokio_test::assert_pending!(drained.poll());

        set.remove(&WorkerId::new("A"));
        tokio_test::assert_pending!(drained.poll());

        set.remove(&WorkerId::new("B"));
        assert!(drained.is_woken());
        tokio_test::assert_ready!(drained.poll());
    }
}
