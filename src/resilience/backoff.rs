//! Exponential backoff with jitter and a failure-history penalty.

use std::time::Duration;

use rand::Rng;

/// Upper bound of the uniform jitter added before capping.
pub const MAX_JITTER_MS: u64 = 1000;

/// Failure counts above this add no further penalty.
pub const MAX_PENALTY_FAILURES: u32 = 5;

/// Calculate the delay before retry `attempt` (zero-based).
///
/// `error_count` is the failure count of the bucket that just failed; each
/// failure up to [`MAX_PENALTY_FAILURES`] stretches the delay by 10%.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64, error_count: u32) -> Duration {
    let jitter = rand::thread_rng().gen_range(0..=MAX_JITTER_MS);
    backoff_with_jitter(attempt, base_ms, max_ms, error_count, jitter)
}

/// [`calculate_backoff`] with the jitter supplied by the caller.
pub fn backoff_with_jitter(
    attempt: u32,
    base_ms: u64,
    max_ms: u64,
    error_count: u32,
    jitter_ms: u64,
) -> Duration {
    let exponential = base_ms.saturating_mul(2u64.saturating_pow(attempt));
    let capped = exponential.saturating_add(jitter_ms).min(max_ms);

    // penalty = 1 + min(count, 5) * 0.1, kept in tenths
    let penalty_tenths = 10 + u64::from(error_count.min(MAX_PENALTY_FAILURES));
    Duration::from_millis(capped.saturating_mul(penalty_tenths) / 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_growth() {
        assert_eq!(backoff_with_jitter(0, 1000, 30_000, 0, 0).as_millis(), 1000);
        assert_eq!(backoff_with_jitter(1, 1000, 30_000, 0, 0).as_millis(), 2000);
        assert_eq!(backoff_with_jitter(2, 1000, 30_000, 0, 0).as_millis(), 4000);
        assert_eq!(backoff_with_jitter(2, 1000, 30_000, 0, 1000).as_millis(), 5000);
    }

    #[test]
    fn test_cap_applies_before_penalty() {
        assert_eq!(backoff_with_jitter(10, 1000, 30_000, 0, 0).as_millis(), 30_000);
        assert_eq!(backoff_with_jitter(10, 1000, 30_000, 5, 0).as_millis(), 45_000);
    }

    #[test]
    fn test_penalty_saturates_at_five() {
        assert_eq!(backoff_with_jitter(0, 1000, 30_000, 1, 0).as_millis(), 1100);
        assert_eq!(backoff_with_jitter(0, 1000, 30_000, 5, 0).as_millis(), 1500);
        assert_eq!(backoff_with_jitter(0, 1000, 30_000, 50, 0).as_millis(), 1500);
    }

    #[test]
    fn test_no_overflow_on_huge_attempt() {
        let d = backoff_with_jitter(200, u64::MAX / 2, u64::MAX, 5, 1000);
        assert!(d.as_millis() > 0);
    }

    #[test]
    fn test_random_jitter_within_bounds() {
        for attempt in 0..4u32 {
            for count in [0u32, 2, 7] {
                let penalty = 10 + u64::from(count.min(5));
                let low = (1000u64 << attempt) * penalty / 10;
                let high = ((1000u64 << attempt) + MAX_JITTER_MS) * penalty / 10;
                for _ in 0..50 {
                    let d = calculate_backoff(attempt, 1000, 30_000, count).as_millis() as u64;
                    assert!(d >= low && d <= high, "attempt {attempt}: {d} not in [{low}, {high}]");
                }
            }
        }
    }

    #[test]
    fn test_random_jitter_respects_cap() {
        for _ in 0..50 {
            let d = calculate_backoff(3, 1000, 5_000, 3).as_millis();
            assert!(d <= 6_500);
        }
    }
}
