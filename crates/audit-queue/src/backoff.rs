//! Exponential backoff with jitter for retried tasks (spec §4.F:
//! `retryBackoffMs(attempt) = base * 2^attempt`, jittered to avoid
//! every retried task waking up at once).

use std::time::Duration;

/// `attempt` is the 1-indexed count of attempts already made when the
/// failure that triggered this backoff occurred — scenario 3 in spec
/// §8 expects `50ms` after the first failure and `100ms` after the
/// second, i.e. `base * 2^(attempt-1)`.
pub fn backoff_duration(base_ms: u64, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let backoff_ms = base_ms.saturating_mul(1u64 << exponent);
    let jitter_ms = (backoff_ms as f64 * 0.2 * fastrand::f64()) as u64;
    Duration::from_millis(backoff_ms + jitter_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_is_roughly_base() {
        let d = backoff_duration(50, 1);
        assert!(d.as_millis() >= 50 && d.as_millis() <= 60);
    }

    #[test]
    fn second_attempt_doubles() {
        let d = backoff_duration(50, 2);
        assert!(d.as_millis() >= 100 && d.as_millis() <= 120);
    }

    #[test]
    fn backoff_grows_monotonically_with_attempt() {
        let a = backoff_duration(2000, 1);
        let b = backoff_duration(2000, 2);
        let c = backoff_duration(2000, 3);
        assert!(a.as_millis() < b.as_millis());
        assert!(b.as_millis() < c.as_millis());
    }
}
