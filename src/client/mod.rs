//! Rate-limited GitHub API client
//!
//! This module handles all network I/O for the harvester:
//! - Building HTTP clients with proper user agent and timeouts
//! - Paginated code-search requests
//! - Repository detail lookups and raw content fetches
//! - Throttling to stay inside the requests-per-minute ceiling
//! - Transparent retry on rate-limit and transient failures

mod github;
mod retry;
mod throttle;

pub use github::{GitHubClient, RepoDetails, SearchItem, SearchPage, SearchRepo, MAX_PAGES, PER_PAGE};
pub use retry::RetryPolicy;
pub use throttle::Throttle;

use reqwest::Client;
use std::time::Duration;

/// Builds the HTTP client shared by all endpoints
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("eigenvim/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}
