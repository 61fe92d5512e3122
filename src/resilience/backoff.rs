//! Retry schedule for connecting to the session store at startup.

use std::time::Duration;

use rand::Rng;

use crate::config::StoreConfig;

/// How many connection attempts to make and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectRetry {
    attempts: u32,
    base: Duration,
    max: Duration,
}

impl ConnectRetry {
    pub fn new(attempts: u32, base: Duration, max: Duration) -> Self {
        Self { attempts: attempts.max(1), base, max: max.max(base) }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay before the attempt following failed attempt number `failed`
    /// (1-based), or `None` once attempts are exhausted.
    ///
    /// Doubles from `base` up to `max`, plus up to 10% jitter.
    pub fn delay_after(&self, failed: u32) -> Option<Duration> {
        if failed == 0 || failed >= self.attempts {
            return None;
        }

        let doubled = self.base.saturating_mul(2u32.saturating_pow(failed - 1));
        let capped = doubled.min(self.max);

        let spread = capped.as_millis() as u64 / 10;
        let jitter = if spread > 0 {
            rand::thread_rng().gen_range(0..spread)
        } else {
            0
        };
        Some(capped + Duration::from_millis(jitter))
    }
}

impl From<&StoreConfig> for ConnectRetry {
    fn from(config: &StoreConfig) -> Self {
        Self::new(
            config.connect_attempts,
            Duration::from_millis(config.retry_base_delay_ms),
            Duration::from_millis(config.retry_max_delay_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn delays_double_then_cap() {
        let retry = ConnectRetry::new(10, ms(100), ms(1000));

        let first = retry.delay_after(1).unwrap();
        assert!(first >= ms(100) && first < ms(110));

        let second = retry.delay_after(2).unwrap();
        assert!(second >= ms(200) && second < ms(220));

        let capped = retry.delay_after(8).unwrap();
        assert!(capped >= ms(1000) && capped < ms(1100));
    }

    #[test]
    fn exhausted_attempts_stop_retrying() {
        let retry = ConnectRetry::new(3, ms(10), ms(50));
        assert!(retry.delay_after(2).is_some());
        assert_eq!(retry.delay_after(3), None);
        assert_eq!(retry.delay_after(0), None);
    }

    #[test]
    fn default_store_config_fails_fast() {
        let retry = ConnectRetry::from(&StoreConfig::default());
        assert_eq!(retry.attempts(), 1);
        assert_eq!(retry.delay_after(1), None);
        assert_eq!(ConnectRetry::new(0, ms(0), ms(0)).attempts(), 1);
    }
}
