//! Exponential backoff for control-plane submissions.
//!
//! Delays grow geometrically from a floor to a ceiling and each one is
//! perturbed by a uniform jitter so that many workers do not retry in
//! lockstep. The submitter resets the policy for every event it starts,
//! so a long retry on one event never penalizes the next.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::models::BackoffConfig;

/// Resettable exponential backoff with uniform jitter.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    min: Duration,
    max: Duration,
    multiple: f64,
    jitter_multiple: f64,
    current: Duration,
}

impl ExponentialBackoff {
    /// Create a new backoff policy.
    ///
    /// `multiple` is the growth factor applied after each delay;
    /// `jitter_multiple` perturbs each returned delay uniformly within
    /// `[1 - j, 1 + j]` of its nominal value.
    pub fn new(min: Duration, max: Duration, multiple: f64, jitter_multiple: f64) -> Self {
        Self {
            min,
            max,
            multiple,
            jitter_multiple,
            current: min,
        }
    }

    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(
            config.min(),
            config.max(),
            config.submit_state_backoff_multiple,
            config.submit_state_backoff_jitter_multiple,
        )
    }

    /// Return the next delay and advance the internal state.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current;

        let advanced = self.current.as_secs_f64() * self.multiple;
        self.current = Duration::from_secs_f64(advanced.min(self.max.as_secs_f64()));

        if self.jitter_multiple > 0.0 {
            let factor = rand::thread_rng()
                .gen_range(1.0 - self.jitter_multiple..=1.0 + self.jitter_multiple);
            base.mul_f64(factor)
        } else {
            base
        }
    }

    /// Restart the schedule from the minimum delay.
    pub fn reset(&mut self) {
        self.current = self.min;
    }
}

/// Drive `operation` until it succeeds, sleeping `backoff.next_delay()`
/// between attempts.
///
/// Retries are unbounded; only cancellation stops them. Returns `None`
/// when the token fires before the operation succeeds.
pub async fn retry_with_backoff<F, Fut, T, E>(
    backoff: &mut ExponentialBackoff,
    cancel: &CancellationToken,
    mut operation: F,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    loop {
        if cancel.is_cancelled() {
            return None;
        }

        match operation().await {
            Ok(value) => return Some(value),
            Err(err) => {
                let delay = backoff.next_delay();
                debug!(error = %err, delay_ms = delay.as_millis() as u64, "attempt failed, backing off");
                tokio::select! {
                    _ = cancel.cancelled() => return None,
                    _ = sleep(delay) => {}
                }
            }
        }
    }
}
