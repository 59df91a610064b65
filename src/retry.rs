use std::future::Future;
use std::time::Duration;

use crate::clients::ClientError;

/// Retry policy for calls to the Core submission endpoint.
///
/// `max_retries` bounds the total number of tries. Network-level failures
/// and the configured HTTP statuses are retryable; any other status is a
/// caller error and surfaces immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub exponential_backoff: bool,
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            exponential_backoff: true,
            retryable_statuses: vec![408, 429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    pub fn is_retryable(&self, err: &ClientError) -> bool {
        match err {
            ClientError::Network(_) => true,
            ClientError::Status { code, .. } => self.retryable_statuses.contains(code),
            ClientError::Invalid(_) => false,
        }
    }

    /// Delay before the next try, after the 1-based `attempt` failed:
    /// `initial_delay * 2^(attempt-1)` capped at `max_delay`, or constant
    /// `initial_delay` when exponential backoff is off.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if !self.exponential_backoff {
            return self.initial_delay.min(self.max_delay);
        }
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Drive `op` until it succeeds, exhausts the budget, or fails
    /// non-retryably. Returns the last error.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut attempt: u32 = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= self.max_retries || !self.is_retryable(&err) {
                        return Err(err);
                    }
                    let delay = self.delay_for(attempt);
                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "downstream call failed, retrying: {err}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
