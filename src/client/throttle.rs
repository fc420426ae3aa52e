//! Minimum-interval throttling between requests
//!
//! The code-search endpoint allows 10 requests per minute even when
//! authenticated, so search requests are spaced at least 6 seconds apart.
//! REST and raw-content requests get a much smaller interval.

use std::time::{Duration, Instant};

/// Enforces a minimum interval between consecutive requests.
///
/// Shared behind a `tokio::sync::Mutex` so that concurrent callers queue up
/// rather than burst past the provider's requests-per-minute ceiling.
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last_request: Option<Instant>,
}

impl Throttle {
    /// Creates a throttle with the given minimum inter-request interval.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: None,
        }
    }

    /// Throttle for the code-search endpoint: 10 requests/minute.
    pub fn for_search() -> Self {
        Self::new(Duration::from_secs(6))
    }

    /// Throttle for REST and raw-content endpoints.
    pub fn for_rest() -> Self {
        Self::new(Duration::from_millis(250))
    }

    /// Sleeps until the minimum interval since the previous request has
    /// elapsed, then records this request.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }

    /// Returns the remaining wait without sleeping (used in tests).
    pub fn pending(&self, now: Instant) -> Duration {
        match self.last_request {
            Some(last) => self
                .min_interval
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_request_is_free() {
        let throttle = Throttle::new(Duration::from_secs(6));
        assert_eq!(throttle.pending(Instant::now()), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_wait_records_request() {
        let mut throttle = Throttle::new(Duration::from_millis(1));
        throttle.wait().await;
        assert!(throttle.last_request.is_some());
    }

    #[tokio::test]
    async fn test_back_to_back_requests_are_spaced() {
        let mut throttle = Throttle::new(Duration::from_millis(20));
        let start = Instant::now();
        throttle.wait().await;
        throttle.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
