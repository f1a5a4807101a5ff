//! Work queue configuration (spec §4.F, §6 options table).

use std::time::Duration;

#[derive(Clone, Debug)]
pub struct WorkQueueConfig {
    /// Worker coroutines running in parallel; the hard bound on
    /// in-flight tasks at any instant (spec §8 property 1).
    pub max_concurrent: usize,
    pub max_retries: u32,
    /// Base for `base * 2^(attempt-1)` exponential backoff, jittered.
    pub retry_backoff_base_ms: u64,
    pub per_task_timeout_ms: u64,
    pub progress_interval_ms: u64,
    /// Soft ceilings: crossing either pauses dispatch of *new* tasks
    /// without touching in-flight ones (spec §4.F backpressure).
    pub memory_soft_ceiling_mb: u64,
    pub cpu_soft_ceiling_percent: f32,
    /// How long a 2x-soft-ceiling breach must persist before the queue
    /// gives up on remaining work (spec §5 hard ceiling).
    pub hard_ceiling_grace: Duration,
    /// In-flight tasks get this long to finish after `cancel()` before
    /// their leases are force-released (spec §4.F cancellation).
    pub cancellation_grace: Duration,
}

impl Default for WorkQueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            max_retries: 3,
            retry_backoff_base_ms: 2000,
            per_task_timeout_ms: 60_000,
            progress_interval_ms: 2_000,
            memory_soft_ceiling_mb: 512,
            cpu_soft_ceiling_percent: 80.0,
            hard_ceiling_grace: Duration::from_secs(30),
            cancellation_grace: Duration::from_secs(10),
        }
    }
}

impl WorkQueueConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be at least 1".into());
        }
        if self.retry_backoff_base_ms == 0 {
            return Err("retry_backoff_base_ms must be positive".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_valid() {
        assert!(WorkQueueConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = WorkQueueConfig { max_concurrent: 0, ..WorkQueueConfig::default() };
        assert!(config.validate().is_err());
    }
}
