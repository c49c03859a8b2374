//! Bounded, cancellable retry for inventory calls.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::booking_creation;
use crate::error::InventoryError;

/// Fixed-delay retry policy: `max_attempts` tries, `delay` between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: booking_creation::DEFAULT_MAX_ATTEMPTS,
            delay: booking_creation::DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy. At least one attempt is always made.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or
    /// runs out of attempts. `op` receives the 1-based attempt number.
    ///
    /// Cancelling `cancel` aborts both an in-flight attempt and the delay
    /// between attempts, yielding `InventoryError::Cancelled`.
    pub async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, InventoryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, InventoryError>>,
    {
        let mut attempt = 1;
        loop {
            if cancel.is_cancelled() {
                return Err(InventoryError::Cancelled);
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(InventoryError::Cancelled),
                result = op(attempt) => result,
            };

            let error = match result {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() || attempt >= self.max_attempts => return Err(e),
                Err(e) => e,
            };

            tracing::warn!(
                attempt,
                max_attempts = self.max_attempts,
                error = %error,
                "inventory call failed, retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(InventoryError::Cancelled),
                _ = tokio::time::sleep(self.delay) => {}
            }
            attempt += 1;
        }
    }
}
