//! 工作页上下文
//!
//! 封装"我正在处理第几个作业、对应哪个标签页"这一信息

use std::fmt::Display;

use crate::models::{JobTarget, WorkerId};

/// 工作页上下文
#[derive(Debug, Clone)]
pub struct WorkerCtx {
    /// 作业序号（从 1 开始，仅用于日志显示）
    pub job_index: usize,

    /// 本批作业总数
    pub job_total: usize,

    /// 工作页标识
    pub id: WorkerId,

    /// 作业链接
    pub target: JobTarget,
}

impl WorkerCtx {
    pub fn new(job_index: usize, job_total: usize, id: WorkerId, target: JobTarget) -> Self {
        Self {
            job_index,
            job_total,
            id,
            target,
        }
    }
}

impl Display for WorkerCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[作业 {}/{} 标签页#{}]",
            self.job_index, self.job_total, self.id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefix() {
        let ctx = WorkerCtx::new(
            2,
            5,
            WorkerId::new("ABC"),
            JobTarget::from("https://www.chess.com/analysis/game/live/1"),
        );
        assert_eq!(ctx.to_string(), "[作业 2/5 标签页#ABC]");
    }
}
