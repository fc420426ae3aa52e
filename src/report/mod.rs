//! Report and artifact generation
//!
//! Renders the aggregated tables into three artifacts:
//! - a markdown report with ranked tables and a skipped-file summary
//! - `eigen.lua`, a loadable consensus config (leader key, winning option
//!   values, recommended plugins, colorschemes)
//! - an optional lazy.nvim plugin spec
//!
//! Rendering is pure string building; writing is a thin `fs::write` on top,
//! so tests assert on content without touching disk.

use crate::stats::{AggregatedStats, Thresholds};
use crate::Result;
use chrono::Utc;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const MARKDOWN_COLORSCHEME_LIMIT: usize = 20;
const MARKDOWN_PLUGIN_LIMIT: usize = 30;
const EIGEN_PLUGIN_LIMIT: usize = 20;
const EIGEN_COLORSCHEME_LIMIT: usize = 10;

/// Writes the markdown report to `path`.
pub fn write_markdown_report(stats: &AggregatedStats, path: &Path) -> Result<()> {
    fs::write(path, render_markdown(stats))?;
    tracing::info!("wrote report to {}", path.display());
    Ok(())
}

/// Writes the consensus config to `path`.
pub fn write_eigen_lua(stats: &AggregatedStats, thresholds: &Thresholds, path: &Path) -> Result<()> {
    fs::write(path, render_eigen_lua(stats, thresholds))?;
    tracing::info!("wrote consensus config to {}", path.display());
    Ok(())
}

/// Writes the lazy.nvim plugin spec to `path`.
pub fn write_plugin_spec(stats: &AggregatedStats, path: &Path) -> Result<()> {
    fs::write(path, render_plugin_spec(stats))?;
    tracing::info!("wrote plugin spec to {}", path.display());
    Ok(())
}

/// Renders the markdown report.
pub fn render_markdown(stats: &AggregatedStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Neovim Configuration Analysis");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Analyzed **{}** Neovim configurations.",
        stats.total_configs
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Skipped: {} unparseable, {} not detected as Neovim configs.",
        stats.unparseable, stats.skipped_non_nvim
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Generated: {}", Utc::now().format("%Y-%m-%d"));

    let _ = writeln!(out);
    let _ = writeln!(out, "## Settings");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Setting | Top value | Configs | % |");
    let _ = writeln!(out, "|---|---|---:|---:|");
    for setting in &stats.settings {
        let _ = writeln!(
            out,
            "| `{}` | `{}` | {} | {:.2}% |",
            setting.key, setting.top_value, setting.count, setting.percentage
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "## Colorschemes");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Colorscheme | Configs | % |");
    let _ = writeln!(out, "|---|---:|---:|");
    for entry in stats.colorschemes.iter().take(MARKDOWN_COLORSCHEME_LIMIT) {
        let _ = writeln!(
            out,
            "| {} | {} | {:.2}% |",
            entry.key, entry.count, entry.percentage
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "## Plugins");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Plugin | Configs | % |");
    let _ = writeln!(out, "|---|---:|---:|");
    for entry in stats.plugins.iter().take(MARKDOWN_PLUGIN_LIMIT) {
        let _ = writeln!(
            out,
            "| `{}` | {} | {:.2}% |",
            entry.key, entry.count, entry.percentage
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "## Keymaps");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Mode | Keys | Configs | % |");
    let _ = writeln!(out, "|---|---|---:|---:|");
    for keymap in &stats.keymaps {
        let _ = writeln!(
            out,
            "| {} | `{}` | {} | {:.2}% |",
            keymap.mode, keymap.lhs, keymap.count, keymap.percentage
        );
    }

    out
}

/// Renders the consensus config.
pub fn render_eigen_lua(stats: &AggregatedStats, thresholds: &Thresholds) -> String {
    let adaptive = stats
        .consensus
        .iter()
        .any(|c| c.percentage < thresholds.consensus);
    let threshold_note = if adaptive {
        let floor = stats
            .consensus
            .iter()
            .map(|c| c.percentage)
            .fold(f64::INFINITY, f64::min);
        format!(
            "Top {} settings (adaptive threshold: {:.1}%+)",
            stats.consensus.len(),
            if floor.is_finite() { floor } else { 0.0 }
        )
    } else {
        format!(
            "Settings appearing in {:.0}%+ of configs",
            thresholds.consensus
        )
    };

    let mut out = String::new();
    let _ = writeln!(out, "-- eigen.lua");
    let _ = writeln!(out, "-- Community-consensus Neovim configuration");
    let _ = writeln!(
        out,
        "-- Based on analysis of {} configurations",
        stats.total_configs
    );
    let _ = writeln!(out, "-- Generated: {}", Utc::now().format("%Y-%m-%d"));
    let _ = writeln!(out, "-- {threshold_note}");
    let _ = writeln!(out);
    let _ = writeln!(out, "local M = {{}}");
    let _ = writeln!(out);
    let _ = writeln!(out, "function M.setup()");
    let _ = writeln!(out, "  -- Leader key (set before lazy.nvim)");
    if let Some(leader) = &stats.leader {
        let _ = writeln!(out, "  vim.g.mapleader = \"{leader}\"");
        if leader == " " {
            let _ = writeln!(out, "  vim.g.maplocalleader = \" \"");
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "  -- Options");
    for setting in &stats.consensus {
        let _ = writeln!(
            out,
            "  vim.opt.{} = {}  -- {:.1}%",
            setting.key, setting.value, setting.percentage
        );
    }
    let _ = writeln!(out, "end");
    let _ = writeln!(out);
    let _ = writeln!(out, "-- Popular plugins (for reference)");
    let _ = writeln!(out, "M.recommended_plugins = {{");
    for entry in stats.plugins.iter().take(EIGEN_PLUGIN_LIMIT) {
        let _ = writeln!(out, "  \"{}\",  -- {:.1}%", entry.key, entry.percentage);
    }
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
    let _ = writeln!(out, "-- Popular colorschemes");
    let _ = writeln!(out, "M.colorschemes = {{");
    for entry in stats.colorschemes.iter().take(EIGEN_COLORSCHEME_LIMIT) {
        let _ = writeln!(out, "  \"{}\",  -- {:.1}%", entry.key, entry.percentage);
    }
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
    let _ = writeln!(out, "return M");
    out
}

/// Renders the lazy.nvim plugin spec.
pub fn render_plugin_spec(stats: &AggregatedStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "-- Popular plugins for lazy.nvim");
    let _ = writeln!(
        out,
        "-- Based on analysis of {} configurations",
        stats.total_configs
    );
    let _ = writeln!(out, "-- Generated: {}", Utc::now().format("%Y-%m-%d"));
    let _ = writeln!(out);
    let _ = writeln!(out, "return {{");
    for entry in &stats.plugin_spec {
        let _ = writeln!(
            out,
            "  {{ \"{}\" }},  -- {:.1}%",
            entry.key, entry.percentage
        );
    }
    let _ = writeln!(out, "}}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;
    use crate::stats::Aggregator;

    fn sample_stats() -> AggregatedStats {
        let mut aggregator = Aggregator::new();
        for _ in 0..4 {
            let (facts, _) = extract(
                "vim.g.mapleader = ' '\n\
                 vim.opt.number = true\n\
                 vim.cmd.colorscheme('tokyonight')\n\
                 require('lazy').setup({ 'folke/lazy.nvim' })",
            );
            aggregator.add_config(&facts);
        }
        let (facts, _) = extract("vim.opt.relativenumber = true");
        aggregator.add_config(&facts);
        aggregator.record_unparseable();
        aggregator.finish(&Thresholds::default())
    }

    #[test]
    fn test_markdown_tables() {
        let report = render_markdown(&sample_stats());
        assert!(report.contains("# Neovim Configuration Analysis"));
        assert!(report.contains("Analyzed **5** Neovim configurations."));
        assert!(report.contains("| `number` | `true` | 4 | 80.00% |"));
        assert!(report.contains("| tokyonight | 4 | 80.00% |"));
        assert!(report.contains("| `folke/lazy.nvim` | 4 | 80.00% |"));
        assert!(report.contains("1 unparseable"));
    }

    #[test]
    fn test_eigen_lua_structure() {
        let rendered = render_eigen_lua(&sample_stats(), &Thresholds::default());
        assert!(rendered.starts_with("-- eigen.lua"));
        assert!(rendered.contains("vim.g.mapleader = \" \""));
        assert!(rendered.contains("vim.g.maplocalleader = \" \""));
        assert!(rendered.contains("vim.opt.number = true  -- 80.0%"));
        // mapleader is emitted in the header, never as an option line
        assert!(!rendered.contains("vim.opt.mapleader"));
        assert!(rendered.contains("\"folke/lazy.nvim\",  -- 80.0%"));
        assert!(rendered.trim_end().ends_with("return M"));
    }

    #[test]
    fn test_plugin_spec_gated_by_threshold() {
        let rendered = render_plugin_spec(&sample_stats());
        assert!(rendered.contains("{ \"folke/lazy.nvim\" },  -- 80.0%"));
        assert!(rendered.trim_end().ends_with('}'));
    }

    #[test]
    fn test_writers_create_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let stats = sample_stats();
        let report = dir.path().join("report.md");
        let eigen = dir.path().join("eigen.lua");
        let spec = dir.path().join("plugins.lua");

        write_markdown_report(&stats, &report).unwrap();
        write_eigen_lua(&stats, &Thresholds::default(), &eigen).unwrap();
        write_plugin_spec(&stats, &spec).unwrap();

        assert!(std::fs::read_to_string(&report).unwrap().contains("## Settings"));
        assert!(std::fs::read_to_string(&eigen).unwrap().contains("local M = {}"));
        assert!(std::fs::read_to_string(&spec).unwrap().starts_with("-- Popular plugins"));
    }
}
