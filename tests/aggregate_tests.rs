//! End-to-end aggregation tests: extract real sources, fold, threshold

use eigenvim::detect::is_neovim_config;
use eigenvim::extract::{extract, ParseOutcome};
use eigenvim::report::{render_eigen_lua, render_markdown};
use eigenvim::stats::{Aggregator, Thresholds};

/// Builds a corpus of 10 configs where `relativenumber` appears in exactly
/// 4 and `number` in all 10.
fn corpus() -> Vec<String> {
    (0..10)
        .map(|i| {
            let mut source = String::from("vim.g.mapleader = \" \"\nvim.opt.number = true\n");
            if i < 4 {
                source.push_str("vim.opt.relativenumber = true\n");
            }
            source
        })
        .collect()
}

fn aggregate(sources: &[String], thresholds: &Thresholds) -> eigenvim::stats::AggregatedStats {
    let mut aggregator = Aggregator::new();
    for source in sources {
        let (facts, outcome) = extract(source);
        match outcome {
            ParseOutcome::Parsed => aggregator.add_config(&facts),
            ParseOutcome::Unparseable => aggregator.record_unparseable(),
        }
    }
    aggregator.finish(thresholds)
}

#[test]
fn test_forty_percent_in_report_gated_from_consensus() {
    let sources = corpus();

    let at_50 = aggregate(
        &sources,
        &Thresholds {
            consensus: 50.0,
            ..Thresholds::default()
        },
    );
    let row = at_50
        .settings
        .iter()
        .find(|s| s.key == "relativenumber")
        .expect("report row");
    assert_eq!(row.count, 4);
    assert_eq!(row.percentage, 40.0);
    let report = render_markdown(&at_50);
    assert!(report.contains("| `relativenumber` | `true` | 4 | 40.00% |"));
    assert!(!at_50.consensus.iter().any(|c| c.key == "relativenumber"));

    let at_30 = aggregate(
        &sources,
        &Thresholds {
            consensus: 30.0,
            ..Thresholds::default()
        },
    );
    assert!(at_30.consensus.iter().any(|c| c.key == "relativenumber"));
    let rendered = render_eigen_lua(&at_30, &Thresholds {
        consensus: 30.0,
        ..Thresholds::default()
    });
    assert!(rendered.contains("vim.opt.relativenumber = true  -- 40.0%"));
    assert!(rendered.contains("vim.g.mapleader = \" \""));
}

#[test]
fn test_counts_bounded_by_total() {
    let stats = aggregate(&corpus(), &Thresholds::default());
    assert_eq!(stats.total_configs, 10);
    for setting in &stats.settings {
        assert!(setting.count <= stats.total_configs);
        assert!(setting.percentage <= 100.0);
    }
}

#[test]
fn test_within_config_repetition_counts_once() {
    let sources = vec![
        "vim.opt.number = true\nvim.opt.number = true\n".to_string(),
    ];
    let stats = aggregate(&sources, &Thresholds::default());
    assert_eq!(stats.settings.len(), 1);
    assert_eq!(stats.settings[0].count, 1);
}

#[test]
fn test_unparseable_sources_excluded_from_denominator() {
    let sources = vec![
        "vim.opt.number = true\n".to_string(),
        "vim.opt.number = = broken ((".to_string(),
    ];
    let stats = aggregate(&sources, &Thresholds::default());
    assert_eq!(stats.total_configs, 1);
    assert_eq!(stats.unparseable, 1);
    assert_eq!(stats.settings[0].percentage, 100.0);
}

#[test]
fn test_detection_filters_before_aggregation() {
    let sources = [
        "vim.opt.number = true\nvim.keymap.set('n', 'q', ':q<CR>')\nvim.g.x = 1\n",
        "local awful = require(\"awful\")\nawful.rules.rules = {}\nlocal wibox = require(\"wibox\")\n",
    ];

    let mut aggregator = Aggregator::new();
    for source in sources {
        if !is_neovim_config(source, 0.5).is_neovim {
            aggregator.record_skipped();
            continue;
        }
        let (facts, _) = extract(source);
        aggregator.add_config(&facts);
    }

    let stats = aggregator.finish(&Thresholds::default());
    assert_eq!(stats.total_configs, 1);
    assert_eq!(stats.skipped_non_nvim, 1);
}

#[test]
fn test_identical_inputs_identical_tables() {
    let sources = corpus();
    let a = aggregate(&sources, &Thresholds::default());
    let b = aggregate(&sources, &Thresholds::default());
    assert_eq!(a.settings, b.settings);
    assert_eq!(a.plugins, b.plugins);
    assert_eq!(a.consensus.len(), b.consensus.len());
    assert_eq!(render_markdown(&a).lines().count(), render_markdown(&b).lines().count());
}
