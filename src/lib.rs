//! # Review All Games
//!
//! 自动完成 chess.com 上所有未复盘对局的复盘：每个对局打开一个标签页，
//! 等待分析完成、评分出现后自动关闭标签页。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有浏览器资源，只暴露能力
//! - `WorkerHost` - 创建 / 关闭 / 探测标签页的抽象，`ChromeHost` 为 CDP 实现
//! - `EventDispatcher` - 按标签页分发 URL 变化和关闭事件
//!
//! ### ② 业务能力层（Services）
//! - `CompletionProbe` - 检查评分元素是否已是合法数字
//! - `RetryScheduler` - 有上限的固定间隔轮询
//! - `LinkCollector` - 从个人主页 / 对局存档页提取对局链接
//!
//! ### ③ 流程层（Workflow）
//! - `WorkerController` - 单个标签页的生命周期状态机
//! - `ActiveWorkerSet` - 尚未结束的标签页集合
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_coordinator` - 扇出所有标签页并等待全部关闭
//! - `orchestrator/app` - 连接浏览器、抓取链接、运行一批

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::connect_to_browser_and_page;
pub use config::{Config, ExhaustedPolicy};
pub use error::{AppError, AppResult};
pub use infrastructure::{ChromeHost, JsExecutor, WorkerHost};
pub use models::{JobTarget, WorkerId};
pub use orchestrator::{App, BatchCoordinator, BatchReport};
pub use workflow::{WorkerController, WorkerOutcome, WorkerPhase, WorkerPolicy};
