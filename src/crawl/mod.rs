//! Resumable crawl over GitHub Code Search
//!
//! This module owns discovery and acquisition:
//! - A fixed set of overlapping query strategies that together cover far
//!   more of the population than any single capped query can
//! - A persistent checkpoint with per-strategy cursors and the global
//!   processed/failed identity sets
//! - An orchestrator that paginates, deduplicates, fetches concurrently
//!   and commits serially

mod checkpoint;
mod orchestrator;
mod strategy;

pub use checkpoint::{CrawlCheckpoint, StrategyProgress, StrategyStatus};
pub use orchestrator::{CrawlOptions, Orchestrator, RunSummary};
pub use strategy::{builtin_strategies, QueryStrategy};
