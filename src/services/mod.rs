pub mod completion_probe;
pub mod link_collector;
pub mod retry_scheduler;

pub use completion_probe::{is_completion_signal, CompletionProbe};
pub use link_collector::{is_source_page, LinkCollector, SourceSite};
pub use retry_scheduler::{PollOutcome, RetryScheduler};
