//! GitHub Code Search and content endpoints
//!
//! One client instance is shared by the whole crawl. Every request consults
//! the throttle for its endpoint class first, and every logical operation is
//! wrapped in the injectable retry policy, so rate-limit recovery is
//! transparent to callers.

use crate::client::{build_http_client, RetryPolicy, Throttle};
use crate::{ClientError, ClientResult};
use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

/// Results per search page; the provider caps any single query at 10 pages.
pub const PER_PAGE: u32 = 100;

/// Hard cap on pages visible for one query (1000 results / 100 per page).
pub const MAX_PAGES: u32 = 10;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";
const API_VERSION: &str = "2022-11-28";

/// One page of code-search results.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

/// One code-search hit: a file path inside a repository.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub path: String,
    pub repository: SearchRepo,
}

/// The repository half of a search hit. The search payload does not include
/// stars or the default branch; those need a separate detail lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRepo {
    pub full_name: String,
    #[serde(default)]
    pub html_url: String,
}

/// Repository details from the repos endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoDetails {
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default = "RepoDetails::fallback_branch")]
    pub default_branch: String,
    #[serde(default)]
    pub pushed_at: Option<String>,
}

impl RepoDetails {
    fn fallback_branch() -> String {
        "main".to_string()
    }
}

impl Default for RepoDetails {
    fn default() -> Self {
        Self {
            stargazers_count: 0,
            default_branch: Self::fallback_branch(),
            pushed_at: None,
        }
    }
}

/// Client for the GitHub REST API with Code Search.
pub struct GitHubClient {
    http: Client,
    token: String,
    api_base: String,
    raw_base: String,
    search_throttle: Mutex<Throttle>,
    rest_throttle: Mutex<Throttle>,
    search_retry: RetryPolicy,
    content_retry: RetryPolicy,
}

impl GitHubClient {
    /// Creates a client against the real GitHub endpoints.
    pub fn new(token: &str) -> ClientResult<Self> {
        Self::with_base_urls(token, DEFAULT_API_BASE, DEFAULT_RAW_BASE)
    }

    /// Creates a client against custom base URLs (used by tests with a mock
    /// server).
    pub fn with_base_urls(token: &str, api_base: &str, raw_base: &str) -> ClientResult<Self> {
        Ok(Self {
            http: build_http_client()?,
            token: token.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            raw_base: raw_base.trim_end_matches('/').to_string(),
            search_throttle: Mutex::new(Throttle::for_search()),
            rest_throttle: Mutex::new(Throttle::for_rest()),
            search_retry: RetryPolicy::for_search(),
            content_retry: RetryPolicy::for_content(),
        })
    }

    /// Replaces the retry policies (tests shrink the delays).
    pub fn with_retry_policies(mut self, search: RetryPolicy, content: RetryPolicy) -> Self {
        self.search_retry = search;
        self.content_retry = content;
        self
    }

    /// Replaces the throttles (tests use zero intervals).
    pub fn with_throttles(mut self, search: Throttle, rest: Throttle) -> Self {
        self.search_throttle = Mutex::new(search);
        self.rest_throttle = Mutex::new(rest);
        self
    }

    /// Fetches one page of code-search results for `query`.
    ///
    /// Pages are 1-based. Rate-limit and transient failures are retried
    /// transparently under the search retry policy; a 422 surfaces as
    /// `QueryRejected`, which callers treat as the query's end-marker.
    pub async fn search_page(&self, query: &str, page: u32) -> ClientResult<SearchPage> {
        let url = format!("{}/search/code", self.api_base);
        let url = &url;
        self.search_retry
            .run("code search", || async move {
                self.search_throttle.lock().await.wait().await;
                let response = self
                    .http
                    .get(url)
                    .query(&[
                        ("q", query.to_string()),
                        ("page", page.to_string()),
                        ("per_page", PER_PAGE.to_string()),
                    ])
                    .bearer_auth(&self.token)
                    .header("Accept", "application/vnd.github+json")
                    .header("X-GitHub-Api-Version", API_VERSION)
                    .send()
                    .await
                    .map_err(classify_send_error)?;
                let response = check_response(response)?;
                response.json::<SearchPage>().await.map_err(ClientError::Http)
            })
            .await
    }

    /// Fetches stars, default branch and push timestamp for one repository.
    pub async fn repo_details(&self, owner: &str, name: &str) -> ClientResult<RepoDetails> {
        let url = format!("{}/repos/{}/{}", self.api_base, owner, name);
        let url = &url;
        self.content_retry
            .run("repo details", || async move {
                self.rest_throttle.lock().await.wait().await;
                let response = self
                    .http
                    .get(url)
                    .bearer_auth(&self.token)
                    .header("Accept", "application/vnd.github+json")
                    .header("X-GitHub-Api-Version", API_VERSION)
                    .send()
                    .await
                    .map_err(classify_send_error)?;
                let response = check_response(response)?;
                response.json::<RepoDetails>().await.map_err(ClientError::Http)
            })
            .await
    }

    /// Fetches the raw text of one file, or `NotFound`.
    pub async fn raw_content(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
        path: &str,
    ) -> ClientResult<String> {
        let url = format!("{}/{}/{}/{}/{}", self.raw_base, owner, name, branch, path);
        let url = &url;
        self.content_retry
            .run("raw content", || async move {
                self.rest_throttle.lock().await.wait().await;
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .map_err(classify_send_error)?;
                let response = check_response(response)?;
                response.text().await.map_err(ClientError::Http)
            })
            .await
    }
}

/// Maps an HTTP response status to the client error taxonomy.
fn check_response(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNPROCESSABLE_ENTITY {
        // Code search answers 422 for rejected queries and for pages past
        // the visible window; both mean "this query is done".
        return Err(ClientError::QueryRejected);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound);
    }
    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ClientError::RateLimited {
            reset_epoch: reset_hint(response.headers()),
        });
    }
    if status.is_server_error() {
        return Err(ClientError::Transient {
            message: format!("server error: HTTP {}", status.as_u16()),
        });
    }
    match response.error_for_status() {
        Ok(response) => Ok(response),
        Err(err) => Err(ClientError::Http(err)),
    }
}

/// Extracts the provider's reset hint from rate-limit headers.
///
/// Prefers the absolute `x-ratelimit-reset` epoch; falls back to a
/// `retry-after` relative delay.
fn reset_hint(headers: &HeaderMap) -> Option<u64> {
    if let Some(reset) = header_u64(headers, "x-ratelimit-reset") {
        return Some(reset);
    }
    let retry_after = header_u64(headers, "retry-after")?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    Some(now + retry_after)
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Classifies a request-send error: timeouts and connection failures are
/// retryable, everything else propagates as an HTTP error.
fn classify_send_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        ClientError::Transient {
            message: "request timeout".to_string(),
        }
    } else if err.is_connect() {
        ClientError::Transient {
            message: "connection failed".to_string(),
        }
    } else {
        ClientError::Http(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_reset_hint_prefers_ratelimit_reset() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));
        headers.insert("retry-after", HeaderValue::from_static("30"));
        assert_eq!(reset_hint(&headers), Some(1_700_000_000));
    }

    #[test]
    fn test_reset_hint_retry_after_is_relative() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("30"));
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let hint = reset_hint(&headers).unwrap();
        assert!(hint >= now + 29 && hint <= now + 31);
    }

    #[test]
    fn test_reset_hint_absent() {
        assert_eq!(reset_hint(&HeaderMap::new()), None);
    }

    #[test]
    fn test_search_page_deserializes_minimal_payload() {
        let page: SearchPage = serde_json::from_str(
            r#"{"total_count": 1, "items": [{"path": "init.lua",
                "repository": {"full_name": "octo/nvim", "html_url": "https://github.com/octo/nvim"}}]}"#,
        )
        .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].repository.full_name, "octo/nvim");
        assert_eq!(page.items[0].path, "init.lua");
    }

    #[test]
    fn test_repo_details_defaults() {
        let details: RepoDetails = serde_json::from_str("{}").unwrap();
        assert_eq!(details.default_branch, "main");
        assert_eq!(details.stargazers_count, 0);
        assert!(details.pushed_at.is_none());
    }
}
