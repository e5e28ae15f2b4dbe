pub mod active_set;
pub mod worker_controller;
pub mod worker_ctx;

pub use active_set::ActiveWorkerSet;
pub use worker_controller::{
    is_completion_url, WorkerController, WorkerOutcome, WorkerPhase, WorkerPolicy,
};
pub use worker_ctx::WorkerCtx;
