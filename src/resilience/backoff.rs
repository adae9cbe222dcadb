//! Backoff delay computation.
//!
//! # Responsibilities
//! - Compute the base delay for a retry attempt (fixed, linear, exponential)
//! - Clamp every delay to the configured maximum
//! - Add jitter to the value that is actually slept on
//!
//! # Design Decisions
//! - `delay` is pure and deterministic; jitter is a separate step
//! - Attempt numbering is 1-based for the first wait; attempt 0 never waits

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// `initial * attempt`
    Linear,
    /// `initial * multiplier^(attempt - 1)`
    #[default]
    Exponential,
    /// `initial`
    Fixed,
}

/// Backoff parameters. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    pub strategy: BackoffStrategy,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Fraction of the base delay added as random jitter (0.1 = up to +10%).
    pub jitter: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            strategy: BackoffStrategy::Exponential,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }
}

impl Backoff {
    /// Base delay before the given attempt, clamped to `[0, max_delay]`.
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay = match self.strategy {
            BackoffStrategy::Linear => self.initial_delay.saturating_mul(attempt),
            BackoffStrategy::Exponential => {
                let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
                let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
                // Overflow, NaN and negative products collapse onto the bounds.
                Duration::try_from_secs_f64(secs).unwrap_or(if secs.is_nan() || secs < 0.0 {
                    Duration::ZERO
                } else {
                    self.max_delay
                })
            }
            BackoffStrategy::Fixed => self.initial_delay,
        };

        delay.min(self.max_delay)
    }

    /// Delay actually waited on: the base delay plus random jitter.
    pub fn jittered(&self, attempt: u32) -> Duration {
        apply_jitter(self.delay(attempt), self.jitter)
    }
}

/// Add `random(0, delay * fraction)` to `delay`.
pub fn apply_jitter(delay: Duration, fraction: f64) -> Duration {
    if delay.is_zero() || fraction <= 0.0 || !fraction.is_finite() {
        return delay;
    }

    let jitter_range = delay.as_secs_f64() * fraction;
    let jitter = rand::thread_rng().gen_range(0.0..jitter_range);
    delay + Duration::from_secs_f64(jitter)
}
