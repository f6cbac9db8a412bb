use std::time::Duration;

/// Strategy for reconnecting after an unexpected close with exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Maximum consecutive automatic attempts before giving up.
    pub max_attempts: u32,
    /// Delay before the first attempt.
    pub base_delay: Duration,
    /// Jitter ratio (0.0..=1.0) applied to delay. Zero keeps delays exact.
    pub jitter_ratio: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            jitter_ratio: 0.0,
        }
    }
}

impl ReconnectPolicy {
    /// Exponential backoff delay for the given attempt (1-based):
    /// `base_delay * 2^(attempt - 1)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        let multiplier = 1u32 << shift;
        self.base_delay
            .checked_mul(multiplier)
            .unwrap_or(Duration::MAX)
    }

    /// Apply jitter to a delay using a symmetric random range.
    pub fn with_jitter(&self, delay: Duration) -> Duration {
        if self.jitter_ratio <= 0.0 {
            return delay;
        }
        let ratio = self.jitter_ratio.clamp(0.0, 1.0);
        let millis = delay.as_millis() as f64;
        let spread = millis * ratio;
        let low = (millis - spread).max(0.0);
        let high = millis + spread;
        let sampled = if high <= low {
            low
        } else {
            rand::random::<f64>() * (high - low) + low
        };
        Duration::from_millis(sampled.round() as u64)
    }

    /// Delay actually waited before `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.with_jitter(self.backoff_delay(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = ReconnectPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            jitter_ratio: 0.0,
        };
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(800));
        assert_eq!(policy.backoff_delay(5), Duration::from_millis(1_600));
    }

    #[test]
    fn huge_attempt_saturates() {
        let policy = ReconnectPolicy {
            base_delay: Duration::from_secs(u64::MAX / 2),
            ..Default::default()
        };
        assert_eq!(policy.backoff_delay(40), Duration::MAX);
    }

    #[test]
    fn zero_jitter_is_exact() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
    }

    #[test]
    fn jitter_stays_in_range() {
        let policy = ReconnectPolicy {
            jitter_ratio: 0.25,
            ..Default::default()
        };
        for _ in 0..100 {
            let delay = policy.with_jitter(Duration::from_millis(1_000));
            assert!(delay >= Duration::from_millis(750));
            assert!(delay <= Duration::from_millis(1_250));
        }
    }
}
