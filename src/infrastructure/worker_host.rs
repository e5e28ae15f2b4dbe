//! 工作页宿主 - 基础设施层
//!
//! 编排层只通过 `WorkerHost` 接触浏览器，生产环境由 `ChromeHost` 实现。

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::AppResult;
use crate::infrastructure::event_dispatch::WorkerObservers;
use crate::models::{JobTarget, WorkerId};

/// 新建的工作页及其观察者
///
/// 观察者在创建时一并注册，不会漏掉创建之后的第一次 URL 变化。
#[derive(Debug)]
pub struct SpawnedWorker {
    pub id: WorkerId,
    pub observers: WorkerObservers,
}

/// 工作页宿主能力
#[async_trait]
pub trait WorkerHost: Send + Sync {
    /// 为作业创建一个可见的工作页并注册观察者
    async fn spawn_worker(&self, target: &JobTarget) -> AppResult<SpawnedWorker>;

    /// 关闭工作页；已关闭或未知的 id 直接返回 `Ok`
    async fn destroy_worker(&self, id: &WorkerId) -> AppResult<()>;

    /// 在工作页自身的上下文里执行只读脚本，返回单个结果
    async fn inspect(&self, id: &WorkerId, script: &str) -> AppResult<JsonValue>;

    /// 注销 URL 变化观察者（幂等）
    fn unobserve_updates(&self, id: &WorkerId);

    /// 注销移除观察者（幂等）
    fn unobserve_removal(&self, id: &WorkerId);
}
