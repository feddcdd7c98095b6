use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::RATE_LIMIT_BACKOFF_MS;
use crate::error::{AppError, Result};

/// When and how long to wait before re-issuing a failed request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// One retry per entry, slept before the retry.
    pub backoff: Vec<Duration>,
    /// Errors not matching this are returned immediately.
    pub retryable: fn(&AppError) -> bool,
}

impl RetryPolicy {
    /// 1s, 2s, 4s on HTTP 429; everything else fails fast.
    pub fn rate_limited() -> Self {
        Self {
            backoff: RATE_LIMIT_BACKOFF_MS
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            retryable: AppError::is_rate_limited,
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.backoff.len() + 1
    }

    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if (self.retryable)(&e) && attempt < self.backoff.len() => {
                    let delay = self.backoff[attempt];
                    attempt += 1;
                    warn!(
                        "[RETRY] {label}: {e} (attempt {attempt}/{}), backing off {}ms",
                        self.max_attempts(),
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::rate_limited()
    }
}
