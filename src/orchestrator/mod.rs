//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 连接浏览器、找到对局列表页面
//! - 抓取对局链接，启动一批复盘
//! - 输出全局统计信息
//!
//! ### `batch_coordinator` - 批处理协调器
//! - 每个对局一个标签页，逐个创建、并发运行
//! - 持有活跃标签页集合，等待全部关闭
//! - 可选的标签页数量上限（Semaphore）
//!
//! ## 层次关系
//!
//! ```text
//! app (抓取链接 → 一批作业)
//!     ↓
//! batch_coordinator (Vec<JobTarget> → 一组控制器)
//!     ↓
//! workflow::WorkerController (单个标签页的生命周期)
//!     ↓
//! services (能力层：完成探测 / 重试调度 / 链接抓取)
//!     ↓
//! infrastructure (基础设施：WorkerHost / ChromeHost / JsExecutor)
//! ```

pub mod app;
pub mod batch_coordinator;

pub use app::App;
pub use batch_coordinator::{join_active, BatchCoordinator, BatchReport};
