//! Crawl orchestrator
//!
//! Sweeps the strategy set in order, paginating each query until exhaustion
//! and fanning fetches for fresh repositories out over a bounded number of
//! concurrent tasks. All state mutation (cache writes, checkpoint updates)
//! happens in a serialized commit step after each page's fetches complete,
//! so a checkpoint never claims an identity the cache does not hold.

use crate::cache::{ConfigCache, FetchedConfig, RepoRef};
use crate::client::{GitHubClient, SearchItem, MAX_PAGES, PER_PAGE};
use crate::crawl::{CrawlCheckpoint, QueryStrategy, StrategyStatus};
use crate::{ClientError, Result};
use futures::future;
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Tunables for one crawl run.
#[derive(Debug, Clone, Copy)]
pub struct CrawlOptions {
    /// Stop after this many configs fetched in this run; None means sweep
    /// everything.
    pub max_repos: Option<u64>,
    /// Concurrent per-item fetches within one page.
    pub concurrency: usize,
    /// Checkpoint every N fetched items, in addition to every page boundary.
    pub checkpoint_every: u64,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_repos: None,
            concurrency: 4,
            checkpoint_every: 10,
        }
    }
}

/// What one run accomplished and how it ended.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    /// Configs fetched and cached in this run.
    pub fetched: u64,
    /// Search hits skipped as already seen.
    pub skipped: u64,
    /// Items that failed to fetch in this run.
    pub failed: u64,
    /// Ended because the stop flag was raised.
    pub stopped: bool,
    /// Ended early on a persistent transient failure; resuming later will
    /// pick up from the saved cursor.
    pub paused: bool,
    /// Ended because the per-run fetch cap was reached.
    pub capped: bool,
}

/// Drives the crawl: strategies, pagination, dedup, fetch, persistence.
pub struct Orchestrator {
    client: GitHubClient,
    cache: ConfigCache,
    strategies: Vec<QueryStrategy>,
    checkpoint: CrawlCheckpoint,
    checkpoint_path: Option<PathBuf>,
    options: CrawlOptions,
    stop: Arc<AtomicBool>,
}

impl Orchestrator {
    /// Creates an orchestrator without checkpoint persistence (one-shot
    /// runs). The processed set is still seeded from the cache.
    pub fn new(
        client: GitHubClient,
        cache: ConfigCache,
        strategies: Vec<QueryStrategy>,
        options: CrawlOptions,
    ) -> Result<Self> {
        let mut checkpoint = CrawlCheckpoint::default();
        checkpoint.processed = cache.cached_ids()?;
        Ok(Self {
            client,
            cache,
            strategies,
            checkpoint,
            checkpoint_path: None,
            options,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Creates an orchestrator that persists its checkpoint at `path`.
    ///
    /// With `resume` the existing checkpoint is loaded; without it the run
    /// starts from a fresh checkpoint (the cache still seeds the processed
    /// set, so cached repositories are never re-fetched either way).
    pub fn with_checkpoint(
        client: GitHubClient,
        cache: ConfigCache,
        strategies: Vec<QueryStrategy>,
        options: CrawlOptions,
        path: PathBuf,
        resume: bool,
    ) -> Result<Self> {
        let mut checkpoint = if resume {
            CrawlCheckpoint::load(&path)?
        } else {
            CrawlCheckpoint::default()
        };
        let cached = cache.cached_ids()?;
        if !cached.is_empty() {
            tracing::debug!("seeding processed set with {} cached repos", cached.len());
            checkpoint.processed.extend(cached);
        }
        Ok(Self {
            client,
            cache,
            strategies,
            checkpoint,
            checkpoint_path: Some(path),
            options,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Clears per-strategy cursors and the failed set, keeping the
    /// processed set.
    pub fn reset_strategies(&mut self) {
        self.checkpoint.reset_strategies();
    }

    /// Handle for cooperative shutdown; raising it lets in-flight fetches
    /// finish, commits them, saves the checkpoint and returns.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Read access for status reporting.
    pub fn checkpoint(&self) -> &CrawlCheckpoint {
        &self.checkpoint
    }

    /// Runs the sweep until every strategy is exhausted or failed, the
    /// per-run cap is hit, the stop flag is raised, or a persistent
    /// transient failure pauses the run.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let strategies = self.strategies.clone();
        let total_strategies = strategies.len();

        for (index, strategy) in strategies.iter().enumerate() {
            if self.should_halt(&summary) {
                break;
            }
            let status = self.checkpoint.progress_mut(&strategy.label).status;
            if matches!(status, StrategyStatus::Exhausted | StrategyStatus::Failed) {
                continue;
            }
            tracing::info!(
                "strategy {}/{} [{}]: {}",
                index + 1,
                total_strategies,
                strategy.label,
                strategy.query
            );
            self.checkpoint.progress_mut(&strategy.label).status = StrategyStatus::Paginating;
            self.paginate_strategy(strategy, &mut summary).await?;
            if summary.paused {
                break;
            }
        }

        summary.stopped = self.stop.load(Ordering::SeqCst);
        summary.capped =
            matches!(self.options.max_repos, Some(max) if summary.fetched >= max);
        self.persist()?;
        tracing::info!(
            "run finished: {} fetched, {} skipped, {} failed (total cached: {})",
            summary.fetched,
            summary.skipped,
            summary.failed,
            self.checkpoint.total_fetched
        );
        Ok(summary)
    }

    /// Pages through one strategy from its saved cursor.
    async fn paginate_strategy(
        &mut self,
        strategy: &QueryStrategy,
        summary: &mut RunSummary,
    ) -> Result<()> {
        loop {
            if self.should_halt(summary) {
                self.persist()?;
                return Ok(());
            }
            let page = self.checkpoint.progress_mut(&strategy.label).next_page;
            if page > MAX_PAGES {
                self.mark(&strategy.label, StrategyStatus::Exhausted)?;
                return Ok(());
            }

            let results = match self.client.search_page(&strategy.query, page).await {
                Ok(results) => results,
                Err(ClientError::QueryRejected) => {
                    // 422 past the visible window or a rejected query; either
                    // way this strategy has nothing more to give.
                    tracing::debug!("[{}] query rejected at page {}", strategy.label, page);
                    self.mark(&strategy.label, StrategyStatus::Exhausted)?;
                    return Ok(());
                }
                Err(err) if err.is_retryable() => {
                    // Retries inside the client are exhausted; pause the run
                    // with the cursor still pointing at this page.
                    tracing::warn!("[{}] pausing run: {}", strategy.label, err);
                    summary.paused = true;
                    self.persist()?;
                    return Ok(());
                }
                Err(err) => {
                    tracing::warn!("[{}] strategy failed: {}", strategy.label, err);
                    self.mark(&strategy.label, StrategyStatus::Failed)?;
                    return Ok(());
                }
            };

            if results.items.is_empty() {
                self.mark(&strategy.label, StrategyStatus::Exhausted)?;
                return Ok(());
            }

            let fresh = self.fresh_items(&results.items, summary);
            tracing::debug!(
                "[{}] page {}: {} hits, {} fresh",
                strategy.label,
                page,
                results.items.len(),
                fresh.len()
            );
            self.fetch_and_commit(fresh, &strategy.label, summary)
                .await?;

            // Advance the cursor past this page, or close the strategy when
            // the provider's visibility window is spent.
            let exhausted = page >= MAX_PAGES
                || u64::from(page) * u64::from(PER_PAGE) >= results.total_count;
            {
                let progress = self.checkpoint.progress_mut(&strategy.label);
                progress.next_page = page + 1;
                if exhausted {
                    progress.status = StrategyStatus::Exhausted;
                }
            }
            self.persist()?;
            if exhausted {
                return Ok(());
            }
        }
    }

    /// Filters a page of hits down to identities never seen before, in page
    /// order, dropping duplicates within the page as well.
    fn fresh_items(&self, items: &[SearchItem], summary: &mut RunSummary) -> Vec<PendingItem> {
        let mut page_seen = BTreeSet::new();
        let mut fresh = Vec::new();
        for item in items {
            let id = item.repository.full_name.clone();
            if RepoRef::split_id(&id).is_none() {
                tracing::debug!("ignoring malformed repository name: {id}");
                continue;
            }
            if self.checkpoint.seen(&id) || !page_seen.insert(id.clone()) {
                summary.skipped += 1;
                continue;
            }
            fresh.push(PendingItem {
                id,
                path: item.path.clone(),
                url: item.repository.html_url.clone(),
            });
        }
        fresh
    }

    /// Fetches fresh items concurrently, then commits results serially.
    ///
    /// The stop flag gates every item launch: once raised, no further fetch
    /// starts, while items already in flight finish and commit normally.
    async fn fetch_and_commit(
        &mut self,
        fresh: Vec<PendingItem>,
        strategy_label: &str,
        summary: &mut RunSummary,
    ) -> Result<()> {
        if fresh.is_empty() {
            return Ok(());
        }
        let budget = match self.options.max_repos {
            Some(max) => {
                let remaining = max.saturating_sub(summary.fetched) as usize;
                fresh.into_iter().take(remaining).collect()
            }
            None => fresh,
        };

        let client = &self.client;
        let stop = Arc::clone(&self.stop);
        let outcomes: Vec<ItemOutcome> = stream::iter(budget)
            .take_while(move |_| future::ready(!stop.load(Ordering::SeqCst)))
            .map(|item| fetch_item(client, item))
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                Ok(config) => {
                    let id = config.repo.id();
                    self.cache.store(&config, strategy_label)?;
                    self.checkpoint.processed.insert(id.clone());
                    self.checkpoint.total_fetched += 1;
                    summary.fetched += 1;
                    tracing::info!(
                        "fetched {} ({} stars) [total: {}]",
                        id,
                        config.repo.stars,
                        self.checkpoint.total_fetched
                    );
                    if self.options.checkpoint_every > 0
                        && summary.fetched % self.options.checkpoint_every == 0
                    {
                        self.persist()?;
                    }
                }
                Err((id, err)) => {
                    tracing::warn!("failed to fetch {}: {}", id, err);
                    self.checkpoint.failed.insert(id);
                    summary.failed += 1;
                }
            }
        }
        Ok(())
    }

    /// True when the run should end before starting more work; stamps the
    /// reason into the summary.
    fn should_halt(&self, summary: &RunSummary) -> bool {
        if self.stop.load(Ordering::SeqCst) {
            return true;
        }
        matches!(self.options.max_repos, Some(max) if summary.fetched >= max)
    }

    fn mark(&mut self, label: &str, status: StrategyStatus) -> Result<()> {
        self.checkpoint.progress_mut(label).status = status;
        self.persist()
    }

    fn persist(&mut self) -> Result<()> {
        if let Some(path) = self.checkpoint_path.clone() {
            self.checkpoint.save(&path)?;
        }
        Ok(())
    }
}

/// One fresh search hit waiting to be fetched.
#[derive(Debug, Clone)]
struct PendingItem {
    id: String,
    path: String,
    url: String,
}

type ItemOutcome = std::result::Result<FetchedConfig, (String, ClientError)>;

/// Fetches one repository's details and raw config content.
///
/// A failed detail lookup degrades to defaults (zero stars, `main`); a
/// failed content fetch fails the item.
async fn fetch_item(client: &GitHubClient, item: PendingItem) -> ItemOutcome {
    let Some((owner, name)) = RepoRef::split_id(&item.id) else {
        return Err((
            item.id.clone(),
            ClientError::Transient {
                message: "malformed repository identity".to_string(),
            },
        ));
    };

    let details = match client.repo_details(owner, name).await {
        Ok(details) => details,
        Err(err) => {
            tracing::debug!("detail lookup failed for {}: {}", item.id, err);
            Default::default()
        }
    };

    let content = client
        .raw_content(owner, name, &details.default_branch, &item.path)
        .await
        .map_err(|err| (item.id.clone(), err))?;

    let url = if item.url.is_empty() {
        format!("https://github.com/{}", item.id)
    } else {
        item.url
    };
    Ok(FetchedConfig {
        repo: RepoRef {
            owner: owner.to_string(),
            name: name.to_string(),
            url,
            stars: details.stargazers_count,
            default_branch: details.default_branch,
            pushed_at: details.pushed_at,
        },
        path: item.path,
        content,
    })
}
