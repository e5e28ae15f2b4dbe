pub mod job;

pub use job::{dedupe_targets, JobTarget, WorkerId};
