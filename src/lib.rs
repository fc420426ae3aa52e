//! Eigenvim: consensus analysis of Neovim configurations
//!
//! This crate harvests `init.lua` files from the GitHub Code Search API,
//! extracts structural configuration facts from them with a real Lua parser,
//! and aggregates the facts into ranked frequency tables and a consensus
//! configuration artifact.

pub mod cache;
pub mod client;
pub mod crawl;
pub mod detect;
pub mod extract;
pub mod report;
pub mod stats;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for eigenvim operations
#[derive(Debug, Error)]
pub enum EigenError {
    #[error("GitHub token required; pass --token or set GH_TOKEN/GITHUB_TOKEN")]
    AuthRequired,

    #[error("{name} threshold out of range: {value}")]
    ThresholdConfig { name: &'static str, value: f64 },

    #[error("checkpoint file {} is corrupt: {message}", path.display())]
    CheckpointCorrupt { path: PathBuf, message: String },

    #[error("cache metadata {} is invalid: {message}", path.display())]
    CacheMeta { path: PathBuf, message: String },

    #[error("client error: {0}")]
    Client(#[from] ClientError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the rate-limited GitHub client
///
/// `RateLimited` is an internal signal: the client sleeps and retries it
/// transparently, so callers only ever observe it folded into `Transient`
/// once the retry budget is spent.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("rate limited (reset epoch: {reset_epoch:?})")]
    RateLimited { reset_epoch: Option<u64> },

    #[error("query rejected by the search endpoint")]
    QueryRejected,

    #[error("resource not found")]
    NotFound,

    #[error("transient fetch failure: {message}")]
    Transient { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    /// Returns true if the error is worth another attempt under the retry policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transient { .. })
    }
}

/// Result type alias for eigenvim operations
pub type Result<T> = std::result::Result<T, EigenError>;

/// Result type alias for client operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;

// Re-export commonly used types
pub use cache::{CachedConfig, ConfigCache, RepoRef};
pub use crawl::{CrawlCheckpoint, Orchestrator, QueryStrategy};
pub use extract::{extract, ParseOutcome, StructuralFact};
pub use stats::{AggregatedStats, Aggregator, Thresholds};
