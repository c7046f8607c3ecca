//! # Backoff between automatic restarts.
//!
//! [`BackoffPolicy`] yields the wait before the next automatic restart of a
//! FAILED service, given how many attempts were already made:
//!
//! ```text
//! delay(n) = min(first × factor^n, max), then jitter
//! ```
//!
//! A fixed restart delay is [`BackoffPolicy::constant`] (factor 1.0, no jitter),
//! which is also the default shape.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use svcvisor::BackoffPolicy;
//!
//! let fixed = BackoffPolicy::constant(Duration::from_millis(1000));
//! assert_eq!(fixed.delay(0), Duration::from_millis(1000));
//! assert_eq!(fixed.delay(7), Duration::from_millis(1000));
//!
//! let growing = BackoffPolicy::exponential(
//!     Duration::from_millis(500),
//!     2.0,
//!     Duration::from_secs(4),
//! );
//! assert_eq!(growing.delay(1), Duration::from_secs(1));
//! assert_eq!(growing.delay(5), Duration::from_secs(4));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Restart backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first automatic restart.
    pub first: Duration,
    /// Multiplicative growth per previous attempt (`1.0` = constant).
    pub factor: f64,
    /// Upper bound for the computed delay.
    pub max: Duration,
    /// Randomization applied after clamping.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Constant 1s delay, capped at 60s, no jitter.
    fn default() -> Self {
        Self::constant(Duration::from_secs(1))
    }
}

impl BackoffPolicy {
    /// Fixed delay between attempts.
    pub fn constant(delay: Duration) -> Self {
        Self {
            first: delay,
            factor: 1.0,
            max: delay.max(Duration::from_secs(60)),
            jitter: JitterPolicy::None,
        }
    }

    /// Delay growing by `factor` per attempt, capped at `max`.
    pub fn exponential(first: Duration, factor: f64, max: Duration) -> Self {
        Self {
            first,
            factor,
            max,
            jitter: JitterPolicy::None,
        }
    }

    /// Returns the policy with a different jitter.
    pub fn with_jitter(mut self, jitter: JitterPolicy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Wait before the next restart after `attempts` previous restart attempts.
    ///
    /// Non-finite or negative intermediate values fall back to [`BackoffPolicy::max`].
    pub fn delay(&self, attempts: u32) -> Duration {
        let exp = attempts.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);
        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };
        self.jitter.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_delay_ignores_attempts() {
        let p = BackoffPolicy::constant(Duration::from_millis(250));
        for n in [0, 1, 5, 100] {
            assert_eq!(p.delay(n), Duration::from_millis(250));
        }
    }

    #[test]
    fn exponential_doubles_until_cap() {
        let p = BackoffPolicy::exponential(
            Duration::from_millis(100),
            2.0,
            Duration::from_millis(700),
        );
        assert_eq!(p.delay(0), Duration::from_millis(100));
        assert_eq!(p.delay(1), Duration::from_millis(200));
        assert_eq!(p.delay(2), Duration::from_millis(400));
        assert_eq!(p.delay(3), Duration::from_millis(700));
    }

    #[test]
    fn overflow_clamps_to_max() {
        let p = BackoffPolicy::exponential(Duration::from_secs(1), 10.0, Duration::from_secs(30));
        assert_eq!(p.delay(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn long_constant_delay_is_not_capped() {
        let p = BackoffPolicy::constant(Duration::from_secs(120));
        assert_eq!(p.delay(3), Duration::from_secs(120));
    }

    #[test]
    fn jitter_never_exceeds_base() {
        let p = BackoffPolicy::constant(Duration::from_millis(400)).with_jitter(JitterPolicy::Full);
        for n in 0..50 {
            assert!(p.delay(n) <= Duration::from_millis(400));
        }
    }
}
