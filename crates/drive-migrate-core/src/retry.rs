use rand::Rng;
use serde::Deserialize;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::Error;

/// Bounded retry with exponential backoff. With `jitter` set, each sleep is
/// drawn from the upper half of the backoff window.
///
/// `max_retries` counts attempts after the first one. A zero `base_delay_ms`
/// retries immediately (busy retry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(5, 200, 5_000)
    }
}

impl RetryPolicy {
    pub const fn exponential(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
            jitter: true,
        }
    }

    pub const fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter: false,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Upper bound of the sleep before retry number `retry` (1-based).
    pub fn ceiling(&self, retry: u32) -> Duration {
        if self.base_delay_ms == 0 || retry == 0 {
            return Duration::ZERO;
        }
        let factor = 1u64.checked_shl(retry - 1).unwrap_or(u64::MAX);
        let ms = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms.max(self.base_delay_ms));
        Duration::from_millis(ms)
    }

    pub fn delay(&self, retry: u32) -> Duration {
        let ceiling = self.ceiling(retry);
        if !self.jitter || ceiling.is_zero() {
            return ceiling;
        }
        let ms = ceiling.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(ms / 2..=ms))
    }

    /// Runs `f` until it succeeds, fails with a non-transient error, or the
    /// attempts are exhausted. `f` receives the 1-based attempt number.
    pub fn run<T, F>(&self, operation: &str, mut f: F) -> Result<T, Error>
    where
        F: FnMut(u32) -> Result<T, Error>,
    {
        let mut attempt = 1;
        loop {
            match f(attempt) {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() && attempt <= self.max_retries => {
                    let delay = self.delay(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient error, retrying"
                    );
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
