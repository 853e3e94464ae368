use anyhow::Result;
use std::thread;
use std::time::Duration;
use tracing::{error, warn};

/// Upper bound on the pause between two attempts.
const MAX_DELAY: Duration = Duration::from_secs(300);

/// Bounded retry with a multiplicative delay between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(3),
            backoff: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Runs `op` until it succeeds or the attempts are used up, returning the
    /// last error in the latter case.
    pub fn run<T>(&self, label: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let attempts = self.max_attempts.max(1);
        let mut delay = self.delay;
        let mut attempt = 1;

        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => {
                    error!("{label}: giving up after {attempts} attempts: {e:#}");
                    return Err(e);
                }
                Err(e) => {
                    warn!("{label}: attempt {attempt}/{attempts} failed, retrying in {delay:?}: {e:#}");
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                    delay = next_delay(delay, self.backoff);
                    attempt += 1;
                }
            }
        }
    }

    /// Like [`RetryPolicy::run`], but absorbs exhaustion into `T::default()`.
    pub fn run_or_default<T: Default>(&self, label: &str, op: impl FnMut() -> Result<T>) -> T {
        self.run(label, op).unwrap_or_default()
    }
}

/// Grows `delay` by `backoff`, capped at [`MAX_DELAY`]. Factors below one,
/// NaN and infinity never shrink the delay nor panic.
fn next_delay(delay: Duration, backoff: f64) -> Duration {
    if delay.is_zero() {
        return delay;
    }
    let factor = if backoff.is_nan() { 1.0 } else { backoff.max(1.0) };
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor)
        .unwrap_or(MAX_DELAY)
        .min(MAX_DELAY)
}
