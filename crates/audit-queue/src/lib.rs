//! Bounded-concurrency work queue that drives a batch of URLs through
//! a [`UrlProcessor`](audit_types::UrlProcessor) with retries, backoff,
//! progress reporting, and resource-aware backpressure (spec §4.F).

pub mod backoff;
pub mod config;
pub mod queue;
pub mod resources;

pub use config::WorkQueueConfig;
pub use queue::{QueueRun, WorkQueue};
pub use resources::{ResourceMonitor, ResourceSample};
