//! 工作页生命周期控制 - 流程层
//!
//! 一个控制器负责一个工作页从创建到销毁的全过程：
//!
//! ```text
//! Created ──▶ Watching ──(URL 末段 == 完成标记)──▶ Probing ──(探测成功)──▶ 关闭标签页
//!    │            │                                  │
//!    └────────────┴──────────(标签页被关闭)───────────┴──▶ Removed
//! ```
//!
//! 探测次数用尽时按 `ExhaustedPolicy` 处理：放任不管，或者强制关闭。

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{Config, ExhaustedPolicy};
use crate::error::AppResult;
use crate::infrastructure::{SpawnedWorker, WorkerHost, WorkerObservers};
use crate::models::{JobTarget, WorkerId};
use crate::services::{CompletionProbe, PollOutcome, RetryScheduler};
use crate::workflow::active_set::ActiveWorkerSet;
use crate::workflow::worker_ctx::WorkerCtx;

/// URL 最后一个 `?` 之后的部分是否等于完成标记
///
/// 例如 `https://www.chess.com/analysis/game/live/1?tab=review`，
/// 分析中是 `tab=analysis`，分析完成后变成 `tab=review`。
pub fn is_completion_url(url: &str, marker: &str) -> bool {
    url.rsplit('?').next() == Some(marker)
}

/// 工作页所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    Created,
    Watching,
    Probing,
    Removed,
}

/// 控制器的最终结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// 探测成功，控制器关闭了标签页
    Completed { attempts: usize },
    /// 标签页在确认完成前被关闭（用户、崩溃或其他原因）
    Removed { phase: WorkerPhase },
    /// 探测次数用尽，按策略强制关闭
    ForceClosed { attempts: usize },
}

/// 每个工作页共用的策略
#[derive(Debug, Clone)]
pub struct WorkerPolicy {
    pub completion_marker: String,
    pub probe: CompletionProbe,
    pub scheduler: RetryScheduler,
    pub exhausted: ExhaustedPolicy,
}

impl WorkerPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            completion_marker: config.completion_marker.clone(),
            probe: CompletionProbe::new(config.rating_selector.clone()),
            scheduler: RetryScheduler::new(config.max_probe_attempts, config.probe_interval()),
            exhausted: config.exhausted_policy,
        }
    }
}

impl Default for WorkerPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

enum Watched {
    MarkerReached(String),
    Removed,
    UpdatesClosed,
}

enum Probed {
    Finished(PollOutcome),
    Removed,
}

/// 工作页生命周期控制器
pub struct WorkerController {
    ctx: WorkerCtx,
    host: Arc<dyn WorkerHost>,
    observers: WorkerObservers,
    active: Arc<ActiveWorkerSet>,
    policy: Arc<WorkerPolicy>,
    phase: WorkerPhase,
}

impl WorkerController {
    /// 创建工作页并登记到活跃集合
    ///
    /// 创建失败直接返回错误，不做重试。
    pub async fn spawn(
        host: Arc<dyn WorkerHost>,
        target: JobTarget,
        job_index: usize,
        job_total: usize,
        active: Arc<ActiveWorkerSet>,
        policy: Arc<WorkerPolicy>,
    ) -> AppResult<Self> {
        let SpawnedWorker { id, observers } = host.spawn_worker(&target).await?;
        active.insert(id.clone());

        let ctx = WorkerCtx::new(job_index, job_total, id, target);
        info!("{} 🆕 已打开: {}", ctx, ctx.target);

        Ok(Self {
            ctx,
            host,
            observers,
            active,
            policy,
            phase: WorkerPhase::Created,
        })
    }

    pub fn id(&self) -> &WorkerId {
        &self.ctx.id
    }

    pub fn phase(&self) -> WorkerPhase {
        self.phase
    }

    /// 驱动状态机直到终态
    pub async fn run(mut self) -> WorkerOutcome {
        self.phase = WorkerPhase::Watching;

        match self.watch().await {
            Watched::MarkerReached(url) => {
                info!("{} 🔎 分析完成，开始检查评分: {}", self.ctx, url);
            }
            Watched::Removed => return self.finish_removed(),
            Watched::UpdatesClosed => {
                debug!("{} URL 观察者已关闭，等待标签页移除", self.ctx);
                let _ = (&mut self.observers.removed).await;
                return self.finish_removed();
            }
        }

        self.phase = WorkerPhase::Probing;
        let probed = tokio::select! {
            biased;
            _ = &mut self.observers.removed => Probed::Removed,
            outcome = self.policy.scheduler.poll_worker(
                &self.policy.probe,
                self.host.as_ref(),
                &self.ctx.id,
            ) => Probed::Finished(outcome),
        };

        match probed {
            Probed::Removed => self.finish_removed(),
            Probed::Finished(PollOutcome::Completed { attempts }) => {
                info!("{} ✅ 评分已出现 (第 {} 次检查)，关闭标签页", self.ctx, attempts);
                self.close_worker().await;
                WorkerOutcome::Completed { attempts }
            }
            Probed::Finished(PollOutcome::Exhausted { attempts }) => {
                self.on_exhausted(attempts).await
            }
        }
    }

    /// 等待 URL 变为完成标记，或标签页被移除
    async fn watch(&mut self) -> Watched {
        loop {
            let update = tokio::select! {
                biased;
                _ = &mut self.observers.removed => return Watched::Removed,
                update = self.observers.updates.recv() => update,
            };

            match update {
                Some(url) if is_completion_url(&url, &self.policy.completion_marker) => {
                    return Watched::MarkerReached(url);
                }
                Some(url) => debug!("{} URL 变化: {}", self.ctx, url),
                None => return Watched::UpdatesClosed,
            }
        }
    }

    async fn on_exhausted(mut self, attempts: usize) -> WorkerOutcome {
        match self.policy.exhausted {
            ExhaustedPolicy::Abandon => {
                warn!(
                    "{} ⚠️ 检查 {} 次仍未出现评分，保留标签页等待手动关闭",
                    self.ctx, attempts
                );
                // 之后只关心标签页何时被关闭
                self.host.unobserve_updates(&self.ctx.id);
                let _ = (&mut self.observers.removed).await;
                self.finish_removed()
            }
            ExhaustedPolicy::ForceClose => {
                warn!(
                    "{} ⚠️ 检查 {} 次仍未出现评分，强制关闭标签页",
                    self.ctx, attempts
                );
                self.close_worker().await;
                WorkerOutcome::ForceClosed { attempts }
            }
        }
    }

    /// 控制器主动关闭标签页
    ///
    /// 先注销观察者再上报，关闭失败只记录日志。
    async fn close_worker(&mut self) {
        self.host.unobserve_updates(&self.ctx.id);
        if let Err(e) = self.host.destroy_worker(&self.ctx.id).await {
            warn!("{} 关闭标签页失败: {}", self.ctx, e);
        }
        self.host.unobserve_removal(&self.ctx.id);

        self.phase = WorkerPhase::Removed;
        self.active.remove(&self.ctx.id);
        debug!("{} 剩余活跃标签页: {}", self.ctx, self.active.len());
    }

    /// 标签页被外部关闭
    fn finish_removed(mut self) -> WorkerOutcome {
        self.host.unobserve_removal(&self.ctx.id);
        self.host.unobserve_updates(&self.ctx.id);

        let phase = self.phase;
        self.phase = WorkerPhase::Removed;
        if self.active.remove(&self.ctx.id) {
            info!("{} 🗑️ 标签页已关闭 (阶段: {:?})", self.ctx, phase);
        }
        WorkerOutcome::Removed { phase }
    }
}
