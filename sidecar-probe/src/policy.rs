//! Poll pacing for configuration waits.
//!
//! A [`PollPolicy`] bounds a wait by total elapsed time (not attempt count)
//! and decides how long to sleep between attempts.

use std::time::Duration;

use sidecar_probe_common::ProbeConfig;
use sidecar_probe_common::config::{
    DEFAULT_WAIT_DELAY, DEFAULT_WAIT_MAX_DELAY, DEFAULT_WAIT_TIMEOUT,
};

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Every sleep is the base delay.
    Constant,
    /// The base delay is multiplied per attempt, up to `max_delay`.
    Exponential { multiplier: f64, max_delay: Duration },
}

/// Timing for [`crate::Sidecar::wait_for_config_with`].
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay after the first failed attempt.
    pub delay: Duration,
    /// Total time budget for the wait.
    pub timeout: Duration,
    pub backoff: Backoff,
    /// Extra random delay as a fraction (0.0-1.0) of the computed delay.
    /// Only ever added, so a sleep is never shorter than the backoff says.
    pub jitter: f64,
    /// Consecutive accepting evaluations required before the wait succeeds.
    pub converge: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_WAIT_DELAY,
            timeout: DEFAULT_WAIT_TIMEOUT,
            backoff: Backoff::Exponential {
                multiplier: 2.0,
                max_delay: DEFAULT_WAIT_MAX_DELAY,
            },
            jitter: 0.0,
            converge: 1,
        }
    }
}

impl PollPolicy {
    /// Policy with the timings from `config`.
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self {
            delay: config.wait_delay,
            timeout: config.wait_timeout,
            backoff: Backoff::Exponential {
                multiplier: 2.0,
                max_delay: config.wait_max_delay,
            },
            ..Self::default()
        }
    }

    /// Fixed `delay` between attempts, no jitter.
    pub fn constant(delay: Duration, timeout: Duration) -> Self {
        Self {
            delay,
            timeout,
            backoff: Backoff::Constant,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub fn with_converge(mut self, converge: u32) -> Self {
        self.converge = converge.max(1);
        self
    }

    /// Consecutive acceptances required, at least 1.
    pub fn required_acceptances(&self) -> u32 {
        self.converge.max(1)
    }

    /// Sleep before the attempt after `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let base_secs = self.delay.as_secs_f64();

        let mut delay = match self.backoff {
            Backoff::Constant => base_secs,
            Backoff::Exponential {
                multiplier,
                max_delay,
            } => {
                let exponent = (attempt - 1).min(64) as i32;
                let factor = multiplier.max(1.0).powi(exponent);
                let max_secs = max_delay.as_secs_f64().max(base_secs);
                (base_secs * factor).min(max_secs)
            }
        };

        if self.jitter > 0.0 && delay > 0.0 {
            delay += delay * fastrand::f64() * self.jitter.min(1.0);
        }

        Duration::from_secs_f64(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_default_values() {
        let policy = PollPolicy::default();
        assert_eq!(policy.delay, Duration::from_millis(100));
        assert_eq!(policy.timeout, Duration::from_secs(30));
        assert_eq!(policy.converge, 1);
        assert_eq!(policy.jitter, 0.0);
        assert_eq!(
            policy.backoff,
            Backoff::Exponential {
                multiplier: 2.0,
                max_delay: Duration::from_secs(2),
            }
        );
    }

    #[test]
    fn test_backoff_delay_exponential() {
        let policy = PollPolicy::default();
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(800));
        assert_eq!(policy.backoff_delay(5), Duration::from_millis(1600));
    }

    #[test]
    fn test_backoff_delay_caps_at_max() {
        let policy = PollPolicy::default();
        assert_eq!(policy.backoff_delay(6), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(60), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(u32::MAX), Duration::from_secs(2));
    }

    #[test]
    fn test_backoff_delay_attempt_zero_is_first() {
        let policy = PollPolicy::default();
        assert_eq!(policy.backoff_delay(0), policy.backoff_delay(1));
    }

    #[test]
    fn test_constant_backoff_never_grows() {
        let policy = PollPolicy::constant(Duration::from_millis(50), Duration::from_secs(1));
        for attempt in 1..20 {
            assert_eq!(policy.backoff_delay(attempt), Duration::from_millis(50));
        }
    }

    #[test]
    fn test_max_delay_below_base_keeps_base() {
        let policy = PollPolicy::default()
            .with_delay(Duration::from_secs(5))
            .with_backoff(Backoff::Exponential {
                multiplier: 2.0,
                max_delay: Duration::from_secs(1),
            });
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_never_shortens_delay() {
        let policy = PollPolicy::constant(Duration::from_millis(100), Duration::from_secs(1))
            .with_jitter(0.5);
        for _ in 0..200 {
            let delay = policy.backoff_delay(1);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(150));
        }
    }

    #[test]
    fn test_builders_clamp() {
        let policy = PollPolicy::default().with_jitter(4.0).with_converge(0);
        assert_eq!(policy.jitter, 1.0);
        assert_eq!(policy.converge, 1);
        assert_eq!(policy.required_acceptances(), 1);
    }

    #[test]
    fn test_from_config_uses_configured_timings() {
        let config = ProbeConfig {
            wait_timeout: Duration::from_secs(5),
            wait_delay: Duration::from_millis(20),
            wait_max_delay: Duration::from_millis(80),
            ..ProbeConfig::default()
        };
        let policy = PollPolicy::from_config(&config);
        assert_eq!(policy.timeout, Duration::from_secs(5));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(20));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(80));
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(80));
    }

    #[test]
    fn test_zero_delay_stays_zero_with_jitter() {
        let policy = PollPolicy::constant(Duration::ZERO, Duration::from_secs(1)).with_jitter(1.0);
        assert_eq!(policy.backoff_delay(3), Duration::ZERO);
    }
}
