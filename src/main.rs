//! eigenvim main entry point
//!
//! Command-line interface for harvesting Neovim configurations from GitHub
//! and distilling them into consensus artifacts.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use eigenvim::cache::ConfigCache;
use eigenvim::client::GitHubClient;
use eigenvim::crawl::{builtin_strategies, CrawlOptions, Orchestrator, QueryStrategy, RunSummary};
use eigenvim::detect::{is_neovim_config, DEFAULT_DETECTION_THRESHOLD};
use eigenvim::extract::{extract, ParseOutcome};
use eigenvim::stats::{Aggregator, Thresholds};
use eigenvim::{report, EigenError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// eigenvim: community-consensus Neovim configuration mining
///
/// Crawls GitHub Code Search for `init.lua` files, extracts settings,
/// keymaps, plugins and colorschemes structurally, and aggregates them
/// into a report and a loadable consensus config.
#[derive(Parser, Debug)]
#[command(name = "eigenvim")]
#[command(version)]
#[command(about = "Harvest Neovim configurations and distill the consensus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch configs for a single query, bounded
    Fetch {
        /// GitHub token; also read from GH_TOKEN or GITHUB_TOKEN
        #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Code-search query
        #[arg(long, default_value = "filename:init.lua path:nvim")]
        query: String,

        /// Stop after this many configs
        #[arg(long, default_value_t = 100)]
        max_repos: u64,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Sweep the full strategy set, resumable across runs
    FetchAll {
        #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Stop after this many configs in this run
        #[arg(long)]
        max_repos: Option<u64>,

        /// Resume from the saved state file (default)
        #[arg(long, conflicts_with = "no_resume")]
        resume: bool,

        /// Ignore the saved state file and start fresh
        #[arg(long)]
        no_resume: bool,

        /// Re-run exhausted and failed queries, keeping fetched repos
        #[arg(long)]
        reset_queries: bool,

        /// Print the query strategy set and exit
        #[arg(long)]
        show_queries: bool,

        /// Checkpoint file
        #[arg(long, default_value = "fetch_state.json")]
        state_file: PathBuf,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Aggregate cached configs into report artifacts
    Analyze {
        #[command(flatten)]
        analyze: AnalyzeArgs,
    },

    /// Fetch for a single query, then analyze
    Run {
        #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Code-search query
        #[arg(long, default_value = "filename:init.lua path:nvim")]
        query: String,

        /// Stop after this many configs
        #[arg(long, default_value_t = 100)]
        max_repos: u64,

        #[command(flatten)]
        fetch: FetchArgs,

        #[command(flatten)]
        analyze: AnalyzeArgs,
    },
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Directory for fetched configs
    #[arg(long, default_value = "configs")]
    output_dir: PathBuf,

    /// Concurrent per-item fetches
    #[arg(long, default_value_t = 4)]
    concurrency: usize,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Directory of cached configs
    #[arg(long, default_value = "configs")]
    input_dir: PathBuf,

    /// Markdown report path
    #[arg(long, default_value = "report.md")]
    report: PathBuf,

    /// Consensus config path
    #[arg(long, default_value = "eigen.lua")]
    eigen_lua: PathBuf,

    /// Optional lazy.nvim plugin spec path
    #[arg(long)]
    plugins_lua: Option<PathBuf>,

    /// Minimum percentage for a report row
    #[arg(long, default_value_t = 1.0)]
    report_threshold: f64,

    /// Minimum percentage for a consensus setting
    #[arg(long, default_value_t = 40.0)]
    consensus_threshold: f64,

    /// Minimum percentage for the plugin spec
    #[arg(long, default_value_t = 5.0)]
    plugin_spec_threshold: f64,

    /// Minimum detection confidence (0 to 1) to accept a file
    #[arg(long, default_value_t = DEFAULT_DETECTION_THRESHOLD)]
    detection_threshold: f64,

    /// Only analyze configs pushed since this date (YYYY-MM-DD, or a window
    /// like 30d, 8w, 6m, 1y)
    #[arg(long)]
    since: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Fetch {
            token,
            query,
            max_repos,
            fetch,
        } => {
            let summary = fetch_single(token, &query, max_repos, &fetch).await?;
            print_summary(&summary);
        }
        Commands::FetchAll {
            token,
            max_repos,
            resume: _,
            no_resume,
            reset_queries,
            show_queries,
            state_file,
            fetch,
        } => {
            if show_queries {
                for (i, strategy) in builtin_strategies().iter().enumerate() {
                    println!("{:2}. [{}] {}", i + 1, strategy.label, strategy.query);
                }
                println!("Total: {} queries", builtin_strategies().len());
                return Ok(());
            }
            let token = resolve_token(token)?;
            let client = GitHubClient::new(&token)?;
            let cache = ConfigCache::open(&fetch.output_dir)?;
            let options = CrawlOptions {
                max_repos,
                concurrency: fetch.concurrency,
                ..Default::default()
            };
            let mut orchestrator = Orchestrator::with_checkpoint(
                client,
                cache,
                builtin_strategies(),
                options,
                state_file,
                !no_resume,
            )?;
            if reset_queries {
                tracing::info!("resetting query cursors, keeping fetched repos");
                orchestrator.reset_strategies();
            }
            install_stop_handler(orchestrator.stop_handle());
            let summary = orchestrator.run().await?;
            print_summary(&summary);
        }
        Commands::Analyze { analyze } => {
            run_analyze(&analyze)?;
        }
        Commands::Run {
            token,
            query,
            max_repos,
            fetch,
            analyze,
        } => {
            // Validate thresholds before spending any network budget.
            thresholds_from(&analyze)?;
            let summary = fetch_single(token, &query, max_repos, &fetch).await?;
            print_summary(&summary);
            run_analyze(&analyze)?;
        }
    }

    Ok(())
}

/// Fetches configs for one ad-hoc query without checkpoint persistence.
async fn fetch_single(
    token: Option<String>,
    query: &str,
    max_repos: u64,
    fetch: &FetchArgs,
) -> anyhow::Result<RunSummary> {
    let token = resolve_token(token)?;
    let client = GitHubClient::new(&token)?;
    let cache = ConfigCache::open(&fetch.output_dir)?;
    let options = CrawlOptions {
        max_repos: Some(max_repos),
        concurrency: fetch.concurrency,
        ..Default::default()
    };
    let strategies = vec![QueryStrategy::new("adhoc", query)];
    let mut orchestrator = Orchestrator::new(client, cache, strategies, options)?;
    install_stop_handler(orchestrator.stop_handle());
    Ok(orchestrator.run().await?)
}

/// Aggregates the cache into the report artifacts.
fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<()> {
    let thresholds = thresholds_from(args)?;
    let since = args
        .since
        .as_deref()
        .map(|text| {
            parse_since(text).ok_or_else(|| {
                anyhow::anyhow!(
                    "invalid --since value {text:?} (expected YYYY-MM-DD or a window like 30d, 6m, 1y)"
                )
            })
        })
        .transpose()?;

    let cache = ConfigCache::open(&args.input_dir)?;
    let configs = cache.load_all()?;
    tracing::info!("analyzing {} cached configs", configs.len());

    let mut stale = 0u64;
    let mut aggregator = Aggregator::new();
    for config in &configs {
        if let Some(cutoff) = since {
            if !pushed_since(config.repo.pushed_at.as_deref(), cutoff) {
                stale += 1;
                continue;
            }
        }
        let detection = is_neovim_config(&config.content, args.detection_threshold);
        if !detection.is_neovim {
            tracing::debug!(
                "skipping {} (confidence {:.2})",
                config.repo.id(),
                detection.confidence
            );
            aggregator.record_skipped();
            continue;
        }
        let (facts, outcome) = extract(&config.content);
        match outcome {
            ParseOutcome::Parsed => aggregator.add_config(&facts),
            ParseOutcome::Unparseable => {
                tracing::debug!("unparseable: {}", config.repo.id());
                aggregator.record_unparseable();
            }
        }
    }

    if let Some(cutoff) = since {
        tracing::info!(
            "excluded {} configs not pushed since {}",
            stale,
            cutoff.format("%Y-%m-%d")
        );
    }

    let stats = aggregator.finish(&thresholds);
    report::write_markdown_report(&stats, &args.report)?;
    report::write_eigen_lua(&stats, &thresholds, &args.eigen_lua)?;
    if let Some(path) = &args.plugins_lua {
        report::write_plugin_spec(&stats, path)?;
    }

    println!(
        "Analyzed {} configs ({} unparseable, {} skipped as non-Neovim)",
        stats.total_configs, stats.unparseable, stats.skipped_non_nvim
    );
    Ok(())
}

/// Builds and validates the thresholds from CLI arguments.
fn thresholds_from(args: &AnalyzeArgs) -> Result<Thresholds, EigenError> {
    let thresholds = Thresholds {
        report: args.report_threshold,
        consensus: args.consensus_threshold,
        plugin_spec: args.plugin_spec_threshold,
    };
    thresholds.validate()?;
    if !(0.0..=1.0).contains(&args.detection_threshold) || args.detection_threshold.is_nan() {
        return Err(EigenError::ThresholdConfig {
            name: "detection",
            value: args.detection_threshold,
        });
    }
    Ok(thresholds)
}

/// Parses a recency cutoff: an absolute `YYYY-MM-DD` date or a relative
/// window like `30d`, `8w`, `6m`, `1y`.
fn parse_since(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    for (suffix, days) in [("d", 1), ("w", 7), ("m", 30), ("y", 365)] {
        if let Some(amount) = text.strip_suffix(suffix) {
            let amount: u32 = amount.parse().ok()?;
            return Some(Utc::now() - Duration::days(i64::from(amount) * days));
        }
    }
    None
}

/// True when the repository was pushed at or after the cutoff. Configs
/// without a parseable push timestamp are excluded by the filter.
fn pushed_since(pushed_at: Option<&str>, cutoff: DateTime<Utc>) -> bool {
    match pushed_at.and_then(|t| DateTime::parse_from_rfc3339(t).ok()) {
        Some(ts) => ts.with_timezone(&Utc) >= cutoff,
        None => false,
    }
}

/// Resolves the API token from the flag or environment.
fn resolve_token(token: Option<String>) -> Result<String, EigenError> {
    token
        .filter(|t| !t.trim().is_empty())
        .or_else(|| std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.trim().is_empty()))
        .ok_or(EigenError::AuthRequired)
}

/// Raises the orchestrator's stop flag on Ctrl-C so in-flight work can
/// finish and the checkpoint can be saved.
fn install_stop_handler(stop: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, finishing in-flight work");
            stop.store(true, Ordering::SeqCst);
        }
    });
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Fetched {} configs ({} skipped as seen, {} failed)",
        summary.fetched, summary.skipped, summary.failed
    );
    if summary.stopped {
        println!("Run interrupted; state saved, resume with fetch-all");
    }
    if summary.paused {
        println!("Run paused on repeated transient failures; resume later");
    }
    if summary.capped {
        println!("Reached --max-repos cap");
    }
}

/// Maps verbosity flags onto the tracing filter.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("eigenvim=info,warn"),
            1 => EnvFilter::new("eigenvim=debug,info"),
            2 => EnvFilter::new("eigenvim=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_since_forms() {
        let absolute = parse_since("2024-06-01").unwrap();
        assert_eq!(absolute.format("%Y-%m-%d").to_string(), "2024-06-01");
        let relative = parse_since("30d").unwrap();
        assert!(relative <= Utc::now() - Duration::days(29));
        assert!(parse_since("8w").is_some());
        assert!(parse_since("6m").is_some());
        assert!(parse_since("1y").is_some());
        assert!(parse_since("soon").is_none());
        assert!(parse_since("").is_none());
    }

    #[test]
    fn test_pushed_since_filter() {
        let cutoff = parse_since("2024-01-01").unwrap();
        assert!(pushed_since(Some("2024-06-01T12:00:00Z"), cutoff));
        assert!(!pushed_since(Some("2023-06-01T12:00:00Z"), cutoff));
        assert!(!pushed_since(Some("not a timestamp"), cutoff));
        assert!(!pushed_since(None, cutoff));
    }
}
