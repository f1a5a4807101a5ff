//! Queue Statistics (spec §3) — a derived snapshot, computed on demand.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStatistics {
    pub total: usize,
    pub pending: usize,
    pub in_flight: usize,
    pub completed: usize,
    pub failed: usize,
    pub retrying: usize,
    pub progress_percent: u8,
    pub average_duration_ms: u64,
    pub estimated_remaining_ms: u64,
    pub active_workers: usize,
    pub memory_usage_mb: u64,
    pub cpu_usage_percent: f32,
}

impl QueueStatistics {
    /// Spec §8 property: `total = pending + inFlight + completed + failed + retrying`.
    pub fn is_internally_consistent(&self) -> bool {
        self.total == self.pending + self.in_flight + self.completed + self.failed + self.retrying
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consistent_counts_pass_the_check() {
        let stats = QueueStatistics {
            total: 10,
            pending: 3,
            in_flight: 2,
            completed: 4,
            failed: 1,
            retrying: 0,
            ..Default::default()
        };
        assert!(stats.is_internally_consistent());
    }

    #[test]
    fn inconsistent_counts_fail_the_check() {
        let stats = QueueStatistics {
            total: 10,
            pending: 3,
            in_flight: 2,
            completed: 4,
            failed: 0,
            retrying: 0,
            ..Default::default()
        };
        assert!(!stats.is_internally_consistent());
    }
}
