//! Exponential reconnect backoff.

use std::time::Duration;

/// Default delay before the first reconnect attempt.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Default number of reconnect attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// `delay(n) = base * 2^(n-1)` for the n-th reconnect, bounded attempts.
///
/// Arithmetic saturates, so the sequence is monotonically non-decreasing
/// for every `n` even when the configured base is huge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base_delay_ms: u64,
    max_attempts: u32,
}

impl BackoffPolicy {
    pub fn new(base_delay_ms: u64, max_attempts: u32) -> Self {
        Self {
            base_delay_ms,
            max_attempts,
        }
    }

    pub fn base_delay_ms(&self) -> u64 {
        self.base_delay_ms
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the `attempt`-th reconnect (1-based). Attempt 0 is treated as 1.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        let factor = 2u64.saturating_pow(exponent);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }

    /// Whether another reconnect may be scheduled after `attempts_so_far`.
    pub fn allows_retry(&self, attempts_so_far: u32) -> bool {
        attempts_so_far < self.max_attempts
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_sequence_doubles_from_one_second() {
        let policy = BackoffPolicy::default();
        let delays: Vec<u64> = (1..=5).map(|n| policy.delay(n).as_millis() as u64).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000]);
    }

    #[test]
    fn allows_retry_stops_at_max() {
        let policy = BackoffPolicy::new(10, 3);
        assert!(policy.allows_retry(0));
        assert!(policy.allows_retry(2));
        assert!(!policy.allows_retry(3));
    }

    #[test]
    fn huge_attempt_counts_saturate() {
        let policy = BackoffPolicy::new(u64::MAX / 2, 200);
        assert_eq!(policy.delay(200), Duration::from_millis(u64::MAX));
    }

    proptest! {
        #[test]
        fn delay_matches_formula(base in 1u64..10_000, n in 1u32..20) {
            let policy = BackoffPolicy::new(base, 20);
            prop_assert_eq!(policy.delay(n), Duration::from_millis(base * (1u64 << (n - 1))));
        }

        #[test]
        fn delay_is_monotonic(base in 0u64..u64::MAX, n in 1u32..100) {
            let policy = BackoffPolicy::new(base, 100);
            prop_assert!(policy.delay(n) <= policy.delay(n + 1));
        }
    }
}
