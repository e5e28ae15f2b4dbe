//! 基础设施层：持有浏览器资源，只暴露能力

pub mod chrome_host;
pub mod event_dispatch;
pub mod js_executor;
pub mod worker_host;

pub use chrome_host::ChromeHost;
pub use event_dispatch::{EventDispatcher, WorkerObservers};
pub use js_executor::JsExecutor;
pub use worker_host::{SpawnedWorker, WorkerHost};
