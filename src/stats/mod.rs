//! Frequency aggregation
//!
//! A pure fold over extracted facts. The core measure is the distinct-config
//! count: a config contributes at most 1 to any key's count no matter how
//! often it repeats the key. Percentages are over parsed, accepted configs;
//! unparseable and skipped files are tallied separately and excluded from
//! the denominator. Rebuilt fully on every run, so identical inputs always
//! give identical tables.

use crate::extract::{SettingScope, StructuralFact};
use crate::{EigenError, Result};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Option keys that are handled specially (leader) or are plugin-internal
/// noise; they never appear in the consensus artifact.
const INTERNAL_KEYS: &[&str] = &[
    "mapleader",
    "maplocalleader",
    "loaded_netrw",
    "loaded_netrwPlugin",
    "base46_cache",
    "have_nerd_font",
];

/// When nothing clears the consensus threshold, fall back to the top N
/// settings so the artifact is never empty.
const CONSENSUS_TOP_N: usize = 30;

/// Keymap rows kept in the report.
const KEYMAP_LIMIT: usize = 100;

/// Percentage cutoffs, validated before any work starts.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    /// Minimum percentage for a row to appear in the markdown report.
    pub report: f64,
    /// Minimum percentage for a setting to enter the consensus artifact.
    pub consensus: f64,
    /// Minimum percentage for a plugin to enter the lazy.nvim spec.
    pub plugin_spec: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            report: 1.0,
            consensus: 40.0,
            plugin_spec: 5.0,
        }
    }
}

impl Thresholds {
    /// Rejects any threshold outside 0 to 100.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("report", self.report),
            ("consensus", self.consensus),
            ("plugin-spec", self.plugin_spec),
        ] {
            if !(0.0..=100.0).contains(&value) || value.is_nan() {
                return Err(EigenError::ThresholdConfig { name, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SettingAccum {
    configs: u64,
    /// Canonical value -> number of configs using it for this key.
    values: HashMap<String, u64>,
}

/// Accumulates facts config by config.
#[derive(Debug, Default)]
pub struct Aggregator {
    total: u64,
    unparseable: u64,
    skipped_non_nvim: u64,
    settings: HashMap<String, SettingAccum>,
    plugins: HashMap<String, u64>,
    colorschemes: HashMap<String, u64>,
    keymaps: HashMap<(String, String), u64>,
    leaders: HashMap<String, u64>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one parsed, accepted config's facts in.
    ///
    /// All counting is deduplicated within the config first: repeating
    /// `vim.opt.number = true` twice still counts once, and a key set to
    /// two different values counts once for the key but once per value.
    pub fn add_config(&mut self, facts: &[StructuralFact]) {
        self.total += 1;

        let mut setting_keys = BTreeSet::new();
        let mut setting_values = BTreeSet::new();
        let mut plugins = BTreeSet::new();
        let mut colorschemes = BTreeSet::new();
        let mut keymaps = BTreeSet::new();
        let mut leaders = BTreeSet::new();

        for fact in facts {
            match fact {
                StructuralFact::Setting { scope, key, value } => {
                    if *scope == SettingScope::Global && key == "mapleader" {
                        leaders.insert(unquote(value).to_string());
                    }
                    setting_keys.insert(key.clone());
                    setting_values.insert((key.clone(), value.clone()));
                }
                StructuralFact::PluginRef { repo, .. } => {
                    plugins.insert(repo.clone());
                }
                StructuralFact::ColorschemeRef { name } => {
                    colorschemes.insert(name.clone());
                }
                StructuralFact::Keymap { mode, lhs, .. } => {
                    keymaps.insert((mode.clone(), lhs.clone()));
                }
            }
        }

        for key in setting_keys {
            self.settings.entry(key).or_default().configs += 1;
        }
        for (key, value) in setting_values {
            *self
                .settings
                .entry(key)
                .or_default()
                .values
                .entry(value)
                .or_default() += 1;
        }
        for plugin in plugins {
            *self.plugins.entry(plugin).or_default() += 1;
        }
        for colorscheme in colorschemes {
            *self.colorschemes.entry(colorscheme).or_default() += 1;
        }
        for keymap in keymaps {
            *self.keymaps.entry(keymap).or_default() += 1;
        }
        for leader in leaders {
            *self.leaders.entry(leader).or_default() += 1;
        }
    }

    /// Counts a config that failed to parse; excluded from the percentage
    /// denominator.
    pub fn record_unparseable(&mut self) {
        self.unparseable += 1;
    }

    /// Counts a config rejected by the detection heuristic.
    pub fn record_skipped(&mut self) {
        self.skipped_non_nvim += 1;
    }

    /// Ranks, thresholds and freezes the accumulated counts.
    pub fn finish(&self, thresholds: &Thresholds) -> AggregatedStats {
        let total = self.total;

        let mut settings: Vec<SettingStat> = self
            .settings
            .iter()
            .map(|(key, accum)| SettingStat {
                key: key.clone(),
                count: accum.configs,
                percentage: percentage(accum.configs, total),
                top_value: top_value(&accum.values).unwrap_or_else(|| "true".to_string()),
            })
            .collect();
        settings.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));

        let plugins = rank(&self.plugins, total);
        let colorschemes = rank(&self.colorschemes, total);

        let mut keymaps: Vec<KeymapStat> = self
            .keymaps
            .iter()
            .map(|((mode, lhs), count)| KeymapStat {
                mode: mode.clone(),
                lhs: lhs.clone(),
                count: *count,
                percentage: percentage(*count, total),
            })
            .collect();
        keymaps.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.lhs.cmp(&b.lhs))
                .then_with(|| a.mode.cmp(&b.mode))
        });
        keymaps.retain(|k| k.percentage >= thresholds.report);
        keymaps.truncate(KEYMAP_LIMIT);

        let consensus = self.consensus_settings(&settings, thresholds.consensus);

        let plugin_spec: Vec<AggregateEntry> = plugins
            .iter()
            .filter(|p| p.percentage >= thresholds.plugin_spec)
            .take(30)
            .cloned()
            .collect();

        let leader = top_value(&self.leaders);

        AggregatedStats {
            total_configs: total,
            unparseable: self.unparseable,
            skipped_non_nvim: self.skipped_non_nvim,
            settings: settings
                .iter()
                .filter(|s| s.percentage >= thresholds.report)
                .cloned()
                .collect(),
            plugins: plugins
                .into_iter()
                .filter(|p| p.percentage >= thresholds.report)
                .collect(),
            colorschemes,
            keymaps,
            leader,
            consensus,
            plugin_spec,
        }
    }

    /// Settings meeting the consensus threshold, or the top N when nothing
    /// does, internal keys always excluded.
    fn consensus_settings(
        &self,
        ranked: &[SettingStat],
        threshold: f64,
    ) -> Vec<ConsensusSetting> {
        let eligible: Vec<&SettingStat> = ranked
            .iter()
            .filter(|s| !INTERNAL_KEYS.contains(&s.key.as_str()))
            .collect();
        let above: Vec<&SettingStat> = eligible
            .iter()
            .copied()
            .filter(|s| s.percentage >= threshold)
            .collect();
        let chosen = if above.is_empty() {
            eligible.into_iter().take(CONSENSUS_TOP_N).collect()
        } else {
            above
        };
        chosen
            .into_iter()
            .map(|s| ConsensusSetting {
                key: s.key.clone(),
                value: s.top_value.clone(),
                percentage: s.percentage,
            })
            .collect()
    }
}

/// Frozen, ranked output of one aggregation run.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedStats {
    /// Parsed, accepted configs; the percentage denominator.
    pub total_configs: u64,
    pub unparseable: u64,
    pub skipped_non_nvim: u64,
    pub settings: Vec<SettingStat>,
    pub plugins: Vec<AggregateEntry>,
    pub colorschemes: Vec<AggregateEntry>,
    pub keymaps: Vec<KeymapStat>,
    /// Most common leader key, when any config sets one.
    pub leader: Option<String>,
    /// Settings for the consensus artifact, with their winning values.
    pub consensus: Vec<ConsensusSetting>,
    /// Plugins for the lazy.nvim spec artifact.
    pub plugin_spec: Vec<AggregateEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateEntry {
    pub key: String,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingStat {
    pub key: String,
    pub count: u64,
    pub percentage: f64,
    /// Canonical value used by the most configs; ties go to the
    /// lexicographically smallest value.
    pub top_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeymapStat {
    pub mode: String,
    pub lhs: String,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsensusSetting {
    pub key: String,
    pub value: String,
    pub percentage: f64,
}

/// Percentage of `count` over `total`, rounded to two decimals.
pub fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = 100.0 * count as f64 / total as f64;
    (raw * 100.0).round() / 100.0
}

fn rank(counts: &HashMap<String, u64>, total: u64) -> Vec<AggregateEntry> {
    let mut entries: Vec<AggregateEntry> = counts
        .iter()
        .map(|(key, count)| AggregateEntry {
            key: key.clone(),
            count: *count,
            percentage: percentage(*count, total),
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    entries
}

/// The value with the highest count; ties go to the lexicographically
/// smallest value so the result is deterministic.
fn top_value(values: &HashMap<String, u64>) -> Option<String> {
    values
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(value, _)| value.clone())
}

/// Strips the canonical double quotes from a rendered string value.
fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
