/// How failed follow-up deliveries are retried across sweep ticks.
///
/// The default policy retries on every tick with no cap and no backoff, and
/// never needs failed attempts to be persisted. Setting `max_attempts` or a
/// non-zero `backoff_base_ms` turns on attempt bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
    pub backoff_base_ms: u64,
    /// Upper bound for a single backoff interval. Zero means uncapped.
    pub backoff_max_ms: u64,
}

impl RetryPolicy {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn records_attempts(&self) -> bool {
        self.max_attempts.is_some() || self.backoff_base_ms > 0
    }

    pub fn is_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts
            .map(|max_attempts| attempts >= max_attempts)
            .unwrap_or(false)
    }

    /// Backoff interval that follows the `attempts`-th failure.
    pub fn backoff_after(&self, attempts: u32) -> u64 {
        if self.backoff_base_ms == 0 || attempts == 0 {
            return 0;
        }

        let multiplier = 2u64.saturating_pow(attempts - 1);
        let interval = self.backoff_base_ms.saturating_mul(multiplier);
        if self.backoff_max_ms == 0 {
            interval
        } else {
            interval.min(self.backoff_max_ms)
        }
    }

    /// Earliest instant at which another attempt is allowed, if backoff applies.
    pub fn next_attempt_at(&self, attempts: u32, last_attempt_at_ms: Option<i64>) -> Option<i64> {
        let last_attempt_at_ms = last_attempt_at_ms?;
        let backoff_ms = self.backoff_after(attempts);
        if backoff_ms == 0 {
            return None;
        }
        let backoff_ms = i64::try_from(backoff_ms).unwrap_or(i64::MAX);
        Some(last_attempt_at_ms.saturating_add(backoff_ms))
    }
}
