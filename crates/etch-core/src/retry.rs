// ── Retry policy ──
//
// Exponential backoff with bounded random jitter and a hard cap. The same
// policy value drives the flag lifecycle's retry loop and its tests; the
// pure `delay_with_jitter` keeps the arithmetic testable without a clock.

use std::time::Duration;

use rand::Rng;

use crate::flags::FlagErrorKind;

/// Hard ceiling for any single backoff delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Parameterized retry/backoff policy.
///
/// Delay for retry `n` (0-indexed) is
/// `min(base_delay * 2^n + jitter, max_delay)` with `jitter` drawn
/// uniformly from `[0, max_jitter]`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
    pub max_delay: Duration,
    /// Which error kinds are worth another attempt.
    pub retryable: fn(FlagErrorKind) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_secs(1),
            max_delay: MAX_BACKOFF,
            retryable: FlagErrorKind::is_retryable,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry `retry_count` with an explicit jitter sample.
    ///
    /// `jitter` is clamped to `max_jitter`; overflow saturates to `max_delay`.
    pub fn delay_with_jitter(&self, retry_count: u32, jitter: Duration) -> Duration {
        let exponential = 2u32
            .checked_pow(retry_count)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX);
        exponential
            .saturating_add(jitter.min(self.max_jitter))
            .min(self.max_delay)
    }

    /// Delay before retry `retry_count`, sampling jitter from the thread RNG.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let max_jitter_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter_ms = if max_jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=max_jitter_ms)
        };
        self.delay_with_jitter(retry_count, Duration::from_millis(jitter_ms))
    }

    /// Whether a failure of `kind` after `retry_count` retries gets another attempt.
    pub fn should_retry(&self, kind: FlagErrorKind, retry_count: u32) -> bool {
        (self.retryable)(kind) && retry_count < self.max_retries
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(base_ms: u64, jitter_ms: u64) -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(base_ms),
            max_jitter: Duration::from_millis(jitter_ms),
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn default_policy() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_retries, 3);
        assert_eq!(p.max_delay, Duration::from_secs(30));
        assert!(p.should_retry(FlagErrorKind::Network, 0));
        assert!(!p.should_retry(FlagErrorKind::Config, 0));
        assert!(!p.should_retry(FlagErrorKind::Unknown, 0));
    }

    #[test]
    fn delay_doubles_per_retry() {
        let p = policy(1000, 0);
        assert_eq!(p.delay_with_jitter(0, Duration::ZERO), Duration::from_millis(1000));
        assert_eq!(p.delay_with_jitter(1, Duration::ZERO), Duration::from_millis(2000));
        assert_eq!(p.delay_with_jitter(3, Duration::ZERO), Duration::from_millis(8000));
    }

    #[test]
    fn delay_is_capped() {
        let p = policy(1000, 500);
        assert_eq!(p.delay_with_jitter(5, Duration::from_millis(500)), MAX_BACKOFF);
        assert_eq!(p.delay_with_jitter(40, Duration::ZERO), MAX_BACKOFF);
    }

    #[test]
    fn jitter_is_clamped_to_bound() {
        let p = policy(100, 50);
        assert_eq!(
            p.delay_with_jitter(0, Duration::from_secs(10)),
            Duration::from_millis(150)
        );
    }

    #[test]
    fn sampled_delay_stays_within_bounds() {
        let p = policy(700, 300);
        for n in 0..8 {
            let lower = p.delay_with_jitter(n, Duration::ZERO);
            let upper = p.delay_with_jitter(n, p.max_jitter);
            for _ in 0..50 {
                let d = p.delay_for(n);
                assert!(d >= lower && d <= upper, "retry {n}: {d:?} not in {lower:?}..={upper:?}");
                assert!(d <= MAX_BACKOFF);
            }
        }
    }

    #[test]
    fn retries_stop_at_cap() {
        let p = RetryPolicy::default();
        assert!(p.should_retry(FlagErrorKind::Timeout, 2));
        assert!(!p.should_retry(FlagErrorKind::Timeout, 3));
        assert!(!RetryPolicy::none().should_retry(FlagErrorKind::Network, 0));
    }
}
