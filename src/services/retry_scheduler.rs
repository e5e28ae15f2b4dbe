//! 重试调度 - 业务能力层
//!
//! 把一次性的完成探测包装成有上限的固定间隔轮询

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::infrastructure::WorkerHost;
use crate::models::WorkerId;
use crate::services::CompletionProbe;

/// 轮询结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// 第 `attempts` 次探测成功
    Completed { attempts: usize },
    /// 探测了 `attempts` 次仍未成功
    Exhausted { attempts: usize },
}

impl PollOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PollOutcome::Completed { .. })
    }

    pub fn attempts(&self) -> usize {
        match self {
            PollOutcome::Completed { attempts } | PollOutcome::Exhausted { attempts } => *attempts,
        }
    }
}

/// 重试调度器
///
/// 探测严格串行，固定间隔，无抖动；成功后立即返回，不再等待。
#[derive(Debug, Clone)]
pub struct RetryScheduler {
    max_attempts: usize,
    interval: Duration,
}

impl RetryScheduler {
    /// `max_attempts` 为 0 时按 1 处理
    pub fn new(max_attempts: usize, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 反复调用 `probe` 直到返回 true 或次数用尽
    ///
    /// `probe` 收到的是从 1 开始的尝试序号。
    pub async fn poll_until_complete<F, Fut>(&self, mut probe: F) -> PollOutcome
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = bool>,
    {
        for attempt in 1..=self.max_attempts {
            if probe(attempt).await {
                return PollOutcome::Completed { attempts: attempt };
            }

            if attempt < self.max_attempts {
                debug!(
                    "探测未通过 (尝试 {}/{}), {:?} 后重试",
                    attempt, self.max_attempts, self.interval
                );
                sleep(self.interval).await;
            }
        }

        PollOutcome::Exhausted {
            attempts: self.max_attempts,
        }
    }

    /// 用完成探测轮询一个工作页
    pub async fn poll_worker(
        &self,
        probe: &CompletionProbe,
        host: &dyn WorkerHost,
        id: &WorkerId,
    ) -> PollOutcome {
        self.poll_until_complete(|_| probe.check(host, id)).await
    }
}

impl Default for RetryScheduler {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(1))
    }
}
