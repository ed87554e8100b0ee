//! Retry schedule for batch writes: exponential backoff with jitter and
//! a bounded attempt budget.

use std::time::Duration;

/// Tracks the retry schedule for one batch. Delays double per retry up
/// to a cap, with up to 25% random jitter added so concurrent batches
/// do not retry in phase. Once the attempt budget is spent, no further
/// delay is issued and the caller must surface the last error.
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
    max_attempts: u32,
    attempt: u32,
}

impl Backoff {
    /// `max_attempts` counts total insert attempts, so a budget of N
    /// permits N - 1 retries.
    pub fn new(base_ms: u64, max_ms: u64, max_attempts: u32) -> Self {
        Self {
            base_ms,
            max_ms,
            max_attempts,
            attempt: 0,
        }
    }

    /// Delay before the next retry, or `None` once the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt.saturating_add(1) >= self.max_attempts {
            return None;
        }
        let factor = match 1u64.checked_shl(self.attempt) {
            Some(f) => f,
            None => u64::MAX,
        };
        let capped = self.base_ms.saturating_mul(factor).min(self.max_ms);
        let jitter = rand::random::<u64>() % (capped / 4 + 1);
        self.attempt += 1;
        Some(Duration::from_millis(capped.saturating_add(jitter)))
    }

    /// Insert attempts consumed so far (including the initial one).
    pub fn attempts(&self) -> u32 {
        self.attempt + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_double_until_cap() {
        let mut backoff = Backoff::new(100, 10_000, 10);
        let first = backoff.next_delay().unwrap().as_millis();
        let second = backoff.next_delay().unwrap().as_millis();
        let third = backoff.next_delay().unwrap().as_millis();
        assert!((100..=125).contains(&first));
        assert!((200..=250).contains(&second));
        assert!((400..=500).contains(&third));
    }

    #[test]
    fn test_budget_exhaustion() {
        let mut backoff = Backoff::new(100, 10_000, 3);
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_none(), "budget of 3 allows 2 retries");
        assert!(backoff.next_delay().is_none(), "exhaustion is sticky");
        assert_eq!(backoff.attempts(), 3);
    }

    #[test]
    fn test_single_attempt_budget_never_retries() {
        let mut backoff = Backoff::new(100, 10_000, 1);
        assert!(backoff.next_delay().is_none());
    }

    #[test]
    fn test_delay_stays_capped_at_extreme_attempt_counts() {
        // Shift counts past 64 must not wrap back down to base_ms.
        let mut backoff = Backoff::new(100, 500, 200);
        for i in 0..199 {
            let delay = backoff.next_delay().unwrap_or_else(|| {
                panic!("budget of 200 must allow retry {i}")
            });
            assert!(delay.as_millis() <= 625, "retry {i}: {delay:?}");
            if i > 2 {
                assert!(delay.as_millis() >= 500, "retry {i} fell below the cap");
            }
        }
        assert!(backoff.next_delay().is_none());
    }
}
