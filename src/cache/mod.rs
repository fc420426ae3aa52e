//! On-disk configuration cache
//!
//! One retrievable unit per repository identity: the raw config text at
//! `<owner>__<name>.lua` plus a `<owner>__<name>.meta.toml` sidecar carrying
//! discovery metadata (strategy, stars, branch, fetch time, content hash).
//! Absence of the `.lua` unit means "not yet fetched".

use crate::{EigenError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Repository identity and discovery attributes.
///
/// Immutable once created; `id()` (the `owner/name` string) is the dedup key
/// for the whole crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
    pub url: String,
    pub stars: u32,
    pub default_branch: String,
    #[serde(default)]
    pub pushed_at: Option<String>,
}

impl RepoRef {
    /// The `owner/name` identity string.
    pub fn id(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Splits an `owner/name` identity into its halves.
    pub fn split_id(id: &str) -> Option<(&str, &str)> {
        let (owner, name) = id.split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some((owner, name))
    }
}

/// Sidecar metadata stored next to each cached config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMeta {
    pub url: String,
    pub stars: u32,
    pub default_branch: String,
    /// Path of the file inside the repository.
    pub path: String,
    /// Label of the query strategy that surfaced this repository.
    pub strategy: String,
    pub fetched_at: DateTime<Utc>,
    /// Hex sha256 of the raw config text.
    pub sha256: String,
    #[serde(default)]
    pub pushed_at: Option<String>,
}

/// A cached configuration: raw source text plus its origin.
#[derive(Debug, Clone)]
pub struct CachedConfig {
    pub repo: RepoRef,
    pub path: String,
    pub content: String,
    pub fetched_at: DateTime<Utc>,
    pub sha256: String,
}

/// A freshly fetched configuration, not yet written to the cache.
#[derive(Debug, Clone)]
pub struct FetchedConfig {
    pub repo: RepoRef,
    pub path: String,
    pub content: String,
}

/// File-backed cache of fetched configurations.
#[derive(Debug, Clone)]
pub struct ConfigCache {
    root: PathBuf,
}

impl ConfigCache {
    /// Opens (creating if needed) a cache rooted at `root`.
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Returns true if a unit for this identity exists.
    pub fn contains(&self, id: &str) -> bool {
        match file_stem_for(id) {
            Some(stem) => self.root.join(format!("{stem}.lua")).exists(),
            None => false,
        }
    }

    /// Enumerates the identities already present on disk.
    ///
    /// The cache is authoritative: the orchestrator folds these into the
    /// checkpoint's processed set at startup so cached repositories are never
    /// re-fetched even when the checkpoint file was lost.
    pub fn cached_ids(&self) -> Result<BTreeSet<String>> {
        let mut ids = BTreeSet::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(stem) = name.strip_suffix(".lua") else {
                continue;
            };
            if let Some((owner, repo)) = stem.split_once("__") {
                if !owner.is_empty() && !repo.is_empty() {
                    ids.insert(format!("{owner}/{repo}"));
                }
            }
        }
        Ok(ids)
    }

    /// Writes one fetched config plus its sidecar.
    ///
    /// The content file lands first; the sidecar follows. A crash between
    /// the two leaves a unit without metadata, which `load_all` tolerates.
    pub fn store(&self, config: &FetchedConfig, strategy: &str) -> Result<()> {
        let id = config.repo.id();
        let stem = file_stem_for(&id).ok_or_else(|| EigenError::CacheMeta {
            path: self.root.clone(),
            message: format!("invalid repository identity: {id}"),
        })?;

        let sha256 = content_hash(&config.content);
        let meta = ConfigMeta {
            url: config.repo.url.clone(),
            stars: config.repo.stars,
            default_branch: config.repo.default_branch.clone(),
            path: config.path.clone(),
            strategy: strategy.to_string(),
            fetched_at: Utc::now(),
            sha256,
            pushed_at: config.repo.pushed_at.clone(),
        };

        fs::write(self.root.join(format!("{stem}.lua")), &config.content)?;
        let meta_path = self.root.join(format!("{stem}.meta.toml"));
        let rendered = toml::to_string_pretty(&meta).map_err(|e| EigenError::CacheMeta {
            path: meta_path.clone(),
            message: e.to_string(),
        })?;
        fs::write(meta_path, rendered)?;
        Ok(())
    }

    /// Loads every cached config, sidecar included when present.
    pub fn load_all(&self) -> Result<Vec<CachedConfig>> {
        let mut configs = Vec::new();
        for id in self.cached_ids()? {
            if let Some(config) = self.load(&id)? {
                configs.push(config);
            }
        }
        Ok(configs)
    }

    /// Loads one cached config by identity, or None when absent.
    pub fn load(&self, id: &str) -> Result<Option<CachedConfig>> {
        let Some(stem) = file_stem_for(id) else {
            return Ok(None);
        };
        let lua_path = self.root.join(format!("{stem}.lua"));
        if !lua_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&lua_path)?;

        let meta_path = self.root.join(format!("{stem}.meta.toml"));
        let meta = if meta_path.exists() {
            let text = fs::read_to_string(&meta_path)?;
            Some(
                toml::from_str::<ConfigMeta>(&text).map_err(|e| EigenError::CacheMeta {
                    path: meta_path.clone(),
                    message: e.to_string(),
                })?,
            )
        } else {
            None
        };

        let (owner, name) = RepoRef::split_id(id).ok_or_else(|| EigenError::CacheMeta {
            path: lua_path.clone(),
            message: format!("invalid repository identity: {id}"),
        })?;

        let sha256 = content_hash(&content);
        let config = match meta {
            Some(meta) => CachedConfig {
                repo: RepoRef {
                    owner: owner.to_string(),
                    name: name.to_string(),
                    url: meta.url,
                    stars: meta.stars,
                    default_branch: meta.default_branch,
                    pushed_at: meta.pushed_at,
                },
                path: meta.path,
                content,
                fetched_at: meta.fetched_at,
                sha256,
            },
            None => CachedConfig {
                repo: RepoRef {
                    owner: owner.to_string(),
                    name: name.to_string(),
                    url: format!("https://github.com/{id}"),
                    stars: 0,
                    default_branch: "main".to_string(),
                    pushed_at: None,
                },
                path: "init.lua".to_string(),
                content,
                fetched_at: Utc::now(),
                sha256,
            },
        };
        Ok(Some(config))
    }
}

/// Hex sha256 of the raw config text.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Maps `owner/name` to the on-disk stem `owner__name`.
fn file_stem_for(id: &str) -> Option<String> {
    let (owner, name) = RepoRef::split_id(id)?;
    Some(format!("{owner}__{name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_config(owner: &str, name: &str) -> FetchedConfig {
        FetchedConfig {
            repo: RepoRef {
                owner: owner.to_string(),
                name: name.to_string(),
                url: format!("https://github.com/{owner}/{name}"),
                stars: 42,
                default_branch: "main".to_string(),
                pushed_at: Some("2024-06-01T00:00:00Z".to_string()),
            },
            path: "init.lua".to_string(),
            content: "vim.opt.number = true\n".to_string(),
        }
    }

    #[test]
    fn test_store_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = ConfigCache::open(dir.path()).unwrap();

        cache.store(&sample_config("octo", "nvim"), "stars:>1000").unwrap();

        let loaded = cache.load("octo/nvim").unwrap().unwrap();
        assert_eq!(loaded.repo.owner, "octo");
        assert_eq!(loaded.repo.stars, 42);
        assert_eq!(loaded.content, "vim.opt.number = true\n");
        assert_eq!(loaded.sha256, content_hash("vim.opt.number = true\n"));
    }

    #[test]
    fn test_cached_ids_lists_units() {
        let dir = TempDir::new().unwrap();
        let cache = ConfigCache::open(dir.path()).unwrap();

        cache.store(&sample_config("a", "one"), "s").unwrap();
        cache.store(&sample_config("b", "two"), "s").unwrap();

        let ids = cache.cached_ids().unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("a/one"));
        assert!(ids.contains("b/two"));
        assert!(cache.contains("a/one"));
        assert!(!cache.contains("c/three"));
    }

    #[test]
    fn test_load_without_sidecar_falls_back() {
        let dir = TempDir::new().unwrap();
        let cache = ConfigCache::open(dir.path()).unwrap();
        std::fs::write(dir.path().join("solo__repo.lua"), "vim.o.ruler = true\n").unwrap();

        let loaded = cache.load("solo/repo").unwrap().unwrap();
        assert_eq!(loaded.repo.stars, 0);
        assert_eq!(loaded.repo.default_branch, "main");
    }

    #[test]
    fn test_split_id_rejects_malformed() {
        assert!(RepoRef::split_id("no-slash").is_none());
        assert!(RepoRef::split_id("/name").is_none());
        assert!(RepoRef::split_id("owner/").is_none());
        assert!(RepoRef::split_id("a/b/c").is_none());
        assert_eq!(RepoRef::split_id("a/b"), Some(("a", "b")));
    }
}
