//! Injectable retry policy
//!
//! One policy is applied uniformly by the client rather than ad hoc retry
//! loops at each call site. Rate-limit signals use the provider's reset hint
//! when present; everything else backs off exponentially.

use crate::ClientError;
use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Longest single wait, regardless of what the provider's reset hint asks for.
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(3600);

/// Retry policy: bounded attempts with exponential backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Backoff for the first retry; doubles each retry after that.
    pub base_delay: Duration,
    /// Ceiling on the computed backoff.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Policy for search requests: these are precious (10/minute), so retry
    /// patiently.
    pub fn for_search() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }

    /// Policy for per-item content and detail fetches: fail fast so a single
    /// bad repository cannot stall the run.
    pub fn for_content() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }

    /// Exponential backoff for the given zero-based retry index.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1u32 << retry.min(16));
        exp.min(self.max_delay)
    }

    /// Runs `op` under this policy.
    ///
    /// Retryable errors (rate-limit signals, transient network failures)
    /// sleep and retry transparently; anything else is returned to the
    /// caller at once. Once attempts are exhausted, a rate-limit signal is
    /// folded into `Transient` so the taxonomy seen by callers stays small.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut last_err: Option<ClientError> = None;

        for attempt in 0..self.max_attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt + 1 < self.max_attempts => {
                    let wait = match &err {
                        ClientError::RateLimited { reset_epoch } => {
                            rate_limit_wait(*reset_epoch).unwrap_or_else(|| self.backoff(attempt))
                        }
                        _ => self.backoff(attempt),
                    };
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        what,
                        attempt + 1,
                        self.max_attempts,
                        err,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    last_err = Some(err);
                }
                Err(err) => {
                    last_err = Some(err);
                    break;
                }
            }
        }

        match last_err {
            Some(ClientError::RateLimited { reset_epoch }) => Err(ClientError::Transient {
                message: format!(
                    "{what}: rate limit persisted after {} attempts (reset epoch: {reset_epoch:?})",
                    self.max_attempts
                ),
            }),
            Some(err) => Err(err),
            // max_attempts == 0; treat as an exhausted budget
            None => Err(ClientError::Transient {
                message: format!("{what}: no attempts permitted by retry policy"),
            }),
        }
    }
}

/// Computes the wait until the provider's reset timestamp, capped.
///
/// Returns None when there is no hint or the reset is already in the past,
/// in which case the caller falls back to exponential backoff.
fn rate_limit_wait(reset_epoch: Option<u64>) -> Option<Duration> {
    let reset = reset_epoch?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    if reset <= now {
        return None;
    }
    Some(Duration::from_secs(reset - now).min(MAX_RATE_LIMIT_WAIT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(7),
        };
        assert_eq!(policy.backoff(0), Duration::from_secs(2));
        assert_eq!(policy.backoff(1), Duration::from_secs(4));
        assert_eq!(policy.backoff(2), Duration::from_secs(7));
        assert_eq!(policy.backoff(10), Duration::from_secs(7));
    }

    #[test]
    fn test_rate_limit_wait_past_reset_is_none() {
        assert_eq!(rate_limit_wait(Some(0)), None);
        assert_eq!(rate_limit_wait(None), None);
    }

    #[tokio::test]
    async fn test_run_retries_transient_then_succeeds() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        };
        let calls = AtomicU32::new(0);
        let result: Result<u32, ClientError> = policy
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(ClientError::Transient {
                            message: "boom".to_string(),
                        })
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_not_found() {
        let policy = RetryPolicy::for_content();
        let calls = AtomicU32::new(0);
        let result: Result<(), ClientError> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ClientError::NotFound) }
            })
            .await;
        assert!(matches!(result, Err(ClientError::NotFound)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_rate_limit_becomes_transient() {
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        };
        let result: Result<(), ClientError> = policy
            .run("test", || async {
                Err(ClientError::RateLimited { reset_epoch: None })
            })
            .await;
        assert!(matches!(result, Err(ClientError::Transient { .. })));
    }
}
