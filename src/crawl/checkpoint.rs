//! Persistent crawl checkpoint
//!
//! One JSON document holds everything a resumed run needs: the set of
//! repository identities already processed, the set that failed, and a
//! per-strategy cursor (next page plus status). Saves are atomic: the
//! document is written to a sibling temp file and renamed over the target,
//! so a crash mid-save leaves the previous checkpoint intact.

use crate::{EigenError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Lifecycle of one query strategy across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyStatus {
    /// Never started.
    #[default]
    Pending,
    /// Started, more pages may remain.
    Paginating,
    /// No further results will ever come from this strategy.
    Exhausted,
    /// Aborted on a non-recoverable error; skipped on resume.
    Failed,
}

/// Cursor for one strategy, keyed by strategy label in the checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyProgress {
    /// Next page to request, 1-based.
    #[serde(default = "first_page")]
    pub next_page: u32,
    #[serde(default)]
    pub status: StrategyStatus,
}

fn first_page() -> u32 {
    1
}

impl Default for StrategyProgress {
    fn default() -> Self {
        Self {
            next_page: 1,
            status: StrategyStatus::Pending,
        }
    }
}

/// Resumable crawl state.
///
/// Every field defaults, so checkpoints written by older versions (or by
/// hand) still load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlCheckpoint {
    /// Repository identities (`owner/name`) already fetched and cached.
    #[serde(default)]
    pub processed: BTreeSet<String>,
    /// Identities that failed fetch or extraction; never retried within the
    /// same checkpoint.
    #[serde(default)]
    pub failed: BTreeSet<String>,
    /// Per-strategy cursors, keyed by strategy label.
    #[serde(default)]
    pub strategies: BTreeMap<String, StrategyProgress>,
    /// Total configs fetched across all runs of this checkpoint.
    #[serde(default)]
    pub total_fetched: u64,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl CrawlCheckpoint {
    /// Loads a checkpoint, or the default when the file does not exist.
    ///
    /// A file that exists but does not parse is an error rather than a
    /// silent fresh start; losing the processed set would re-fetch the
    /// entire population.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| EigenError::CheckpointCorrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Saves atomically via a sibling temp file and rename.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.saved_at = Some(Utc::now());
        let rendered = serde_json::to_string_pretty(self).map_err(|e| {
            EigenError::CheckpointCorrupt {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;
        let tmp = path.with_extension("json.tmp");
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&tmp, rendered)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Cursor for a strategy label, creating the default on first access.
    pub fn progress_mut(&mut self, label: &str) -> &mut StrategyProgress {
        self.strategies.entry(label.to_string()).or_default()
    }

    /// Resets every strategy cursor to page 1 / `Pending` and clears the
    /// failed set. The processed set is kept; cached repositories stay
    /// deduplicated.
    pub fn reset_strategies(&mut self) {
        self.strategies.clear();
        self.failed.clear();
    }

    /// True when the identity has already been processed or permanently
    /// failed.
    pub fn seen(&self, id: &str) -> bool {
        self.processed.contains(id) || self.failed.contains(id)
    }
}
