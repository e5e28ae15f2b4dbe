//! 批处理协调器 - 编排层
//!
//! ## 职责
//!
//! 1. **扇出**：按输入顺序为每个作业创建工作页和控制器（逐个 await 创建，之后并发运行）
//! 2. **活跃集合**：持有 `ActiveWorkerSet`，控制器完成或被移除时从中删除
//! 3. **汇合**：轮询活跃集合，直到所有工作页都关闭
//! 4. **准入控制**（可选）：用 Semaphore 限制同时存在的工作页数量，默认不限制
//!
//! 没有整体超时，也没有取消：某个作业一直不出结果时，汇合会一直等下去。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::WorkerHost;
use crate::models::JobTarget;
use crate::workflow::{ActiveWorkerSet, WorkerController, WorkerOutcome, WorkerPolicy};

/// 一批作业的结果统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// 创建的工作页数
    pub spawned: usize,
    /// 探测成功并由控制器关闭的
    pub completed: usize,
    /// 被外部关闭的
    pub removed: usize,
    /// 探测次数用尽后强制关闭的
    pub force_closed: usize,
    /// 控制器任务异常退出的
    pub lost: usize,
}

impl BatchReport {
    fn record(&mut self, outcome: WorkerOutcome) {
        match outcome {
            WorkerOutcome::Completed { .. } => self.completed += 1,
            WorkerOutcome::Removed { .. } => self.removed += 1,
            WorkerOutcome::ForceClosed { .. } => self.force_closed += 1,
        }
    }
}

/// 等待活跃集合清空
///
/// 每隔 `poll_interval` 检查一次；集合清空时会被立即唤醒，不必等满一个间隔。
pub async fn join_active(active: &ActiveWorkerSet, poll_interval: Duration) {
    loop {
        let drained = active.drained();
        let remaining = active.len();
        if remaining == 0 {
            break;
        }

        info!("⏳ 仍有 {} 个标签页在复盘中", remaining);
        tokio::select! {
            _ = sleep(poll_interval) => {}
            _ = drained => {}
        }
    }
}

/// 批处理协调器
pub struct BatchCoordinator {
    host: Arc<dyn WorkerHost>,
    policy: Arc<WorkerPolicy>,
    join_poll_interval: Duration,
    admission: Option<Arc<Semaphore>>,
}

impl BatchCoordinator {
    pub fn new(host: Arc<dyn WorkerHost>, policy: WorkerPolicy, join_poll_interval: Duration) -> Self {
        Self {
            host,
            policy: Arc::new(policy),
            join_poll_interval,
            admission: None,
        }
    }

    pub fn from_config(host: Arc<dyn WorkerHost>, config: &Config) -> Self {
        Self::new(
            host,
            WorkerPolicy::from_config(config),
            config.join_poll_interval(),
        )
        .with_max_concurrent(config.max_concurrent_workers)
    }

    /// 限制同时存在的工作页数量，`None` 表示不限制
    pub fn with_max_concurrent(mut self, limit: Option<usize>) -> Self {
        self.admission = limit.map(|n| Arc::new(Semaphore::new(n.max(1))));
        self
    }

    /// 运行一批作业，所有工作页关闭后返回
    ///
    /// 输入为空时立即返回；任意一个工作页创建失败则整批失败。
    pub async fn run_batch(&self, targets: &[JobTarget]) -> AppResult<BatchReport> {
        if targets.is_empty() {
            info!("没有需要复盘的对局");
            return Ok(BatchReport::default());
        }

        let total = targets.len();
        let active = Arc::new(ActiveWorkerSet::new());
        let mut handles = Vec::with_capacity(total);

        log_batch_start(total, self.admission.is_some());

        // 逐个创建，创建完成后各自并发运行
        for (idx, target) in targets.iter().enumerate() {
            let job_index = idx + 1;

            let permit = match &self.admission {
                Some(semaphore) => Some(semaphore.clone().acquire_owned().await?),
                None => None,
            };

            let controller = WorkerController::spawn(
                self.host.clone(),
                target.clone(),
                job_index,
                total,
                active.clone(),
                self.policy.clone(),
            )
            .await
            .map_err(|e| {
                error!("[作业 {}/{}] ❌ 创建标签页失败: {}", job_index, total, e);
                e
            })?;

            let handle = tokio::spawn(async move {
                let _permit = permit;
                controller.run().await
            });
            handles.push((job_index, handle));
        }

        debug!("已创建 {} 个标签页，等待全部关闭", total);
        join_active(&active, self.join_poll_interval).await;
        info!("✓ 所有标签页已关闭");

        // 集合清空时每个控制器都已给出结果
        let mut report = BatchReport {
            spawned: total,
            ..Default::default()
        };
        for (job_index, handle) in handles {
            match handle.await {
                Ok(outcome) => {
                    debug!("[作业 {}/{}] 结果: {:?}", job_index, total, outcome);
                    report.record(outcome);
                }
                Err(e) => {
                    error!("[作业 {}/{}] 控制器任务异常: {}", job_index, total, e);
                    report.lost += 1;
                }
            }
        }

        log_batch_complete(&report);
        Ok(report)
    }
}

// ========== 日志辅助函数 ==========

fn log_batch_start(total: usize, limited: bool) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始复盘 {} 个对局", total);
    if limited {
        info!("📊 已启用标签页数量上限");
    }
    info!("{}", "=".repeat(60));
}

fn log_batch_complete(report: &BatchReport) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 本批完成: 复盘成功 {}/{}, 外部关闭 {}, 强制关闭 {}",
        report.completed, report.spawned, report.removed, report.force_closed
    );
    info!("{}", "─".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkerId;

    #[tokio::test(start_paused = true)]
    async fn test_join_waits_for_last_worker() {
        let active = Arc::new(ActiveWorkerSet::new());
        active.insert(WorkerId::new("A"));

        let mut join = tokio_test::task::spawn(join_active(&active, Duration::from_secs(2)));
        tokio_test::assert_pending!(join.poll());

        // 过了好几个轮询间隔仍未结束
        tokio::time::advance(Duration::from_secs(7)).await;
        tokio_test::assert_pending!(join.poll());

        active.remove(&WorkerId::new("A"));
        tokio_test::assert_ready!(join.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_resolves_within_one_interval() {
        let active = Arc::new(ActiveWorkerSet::new());
        active.insert(WorkerId::new("A"));

        let remover = active.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(4500)).await;
            remover.remove(&WorkerId::new("A"));
        });

        let start = tokio::time::Instant::now();
        join_active(&active, Duration::from_secs(2)).await;
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(4500));
        assert!(elapsed <= Duration::from_millis(6500));
    }

    #[tokio::test]
    async fn test_join_on_empty_set_returns_immediately() {
        let active = ActiveWorkerSet::new();
        let mut join = tokio_test::task::spawn(join_active(&active, Duration::from_secs(2)));
        tokio_test::assert_ready!(join.poll());
    }

    #[test]
    fn test_report_records_outcomes() {
        let mut report = BatchReport::default();
        report.record(WorkerOutcome::Completed { attempts: 2 });
        report.record(WorkerOutcome::Removed {
            phase: crate::workflow::WorkerPhase::Watching,
        });
        report.record(WorkerOutcome::ForceClosed { attempts: 10 });
        report.record(WorkerOutcome::Completed { attempts: 1 });

        assert_eq!(report.completed, 2);
        assert_eq!(report.removed, 1);
        assert_eq!(report.force_closed, 1);
    }
}
