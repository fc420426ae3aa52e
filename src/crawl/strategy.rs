//! Query strategy set
//!
//! Code search caps every query at 1000 visible results, so a single query
//! can never enumerate the population. Coverage comes from many overlapping
//! queries segmented by path, star bracket, creation year, push window and
//! topic. Overlap between strategies is expected; the orchestrator's
//! processed set deduplicates across all of them.
//!
//! Labels are stable identifiers: the checkpoint keys per-strategy progress
//! by label, so reordering or inserting strategies never corrupts resume
//! state.

/// One search query with a stable label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryStrategy {
    /// Stable checkpoint key, unique within the set.
    pub label: String,
    /// The code-search query string.
    pub query: String,
}

impl QueryStrategy {
    pub fn new(label: &str, query: &str) -> Self {
        Self {
            label: label.to_string(),
            query: query.to_string(),
        }
    }
}

/// (label, query) pairs for the built-in strategy set.
const BUILTIN: &[(&str, &str)] = &[
    // Path variations
    ("path-config-nvim", "filename:init.lua path:.config/nvim"),
    ("path-nvim", "filename:init.lua path:nvim"),
    ("path-dotfiles", "filename:init.lua path:dotfiles"),
    ("path-config", "filename:init.lua path:config"),
    // Star brackets, highest first
    ("stars-gt1000", "filename:init.lua stars:>1000"),
    ("stars-500-1000", "filename:init.lua stars:500..1000"),
    ("stars-200-500", "filename:init.lua stars:200..500"),
    ("stars-100-200", "filename:init.lua stars:100..200"),
    ("stars-50-100", "filename:init.lua stars:50..100"),
    ("stars-20-50", "filename:init.lua stars:20..50"),
    ("stars-10-20", "filename:init.lua stars:10..20"),
    ("stars-5-10", "filename:init.lua stars:5..10"),
    ("stars-1-5", "filename:init.lua stars:1..5"),
    ("stars-0", "filename:init.lua stars:0"),
    // Creation year windows
    ("created-2024", "filename:init.lua created:2024-01-01..2024-12-31"),
    ("created-2023", "filename:init.lua created:2023-01-01..2023-12-31"),
    ("created-2022", "filename:init.lua created:2022-01-01..2022-12-31"),
    ("created-2021", "filename:init.lua created:2021-01-01..2021-12-31"),
    ("created-2020", "filename:init.lua created:2020-01-01..2020-12-31"),
    ("created-2019", "filename:init.lua created:2019-01-01..2019-12-31"),
    ("created-2018", "filename:init.lua created:2018-01-01..2018-12-31"),
    ("created-2017", "filename:init.lua created:2017-01-01..2017-12-31"),
    ("created-pre2017", "filename:init.lua created:<2017-01-01"),
    // Push windows, most recently active first
    ("pushed-recent", "filename:init.lua pushed:>2024-06-01"),
    ("pushed-2024h1", "filename:init.lua pushed:2024-01-01..2024-06-01"),
    ("pushed-2023h2", "filename:init.lua pushed:2023-06-01..2024-01-01"),
    ("pushed-2023h1", "filename:init.lua pushed:2023-01-01..2023-06-01"),
    // Language-qualified variants
    ("lua", "language:lua filename:init.lua"),
    ("lua-stars-gt100", "language:lua filename:init.lua stars:>100"),
    ("lua-stars-10-100", "language:lua filename:init.lua stars:10..100"),
    ("lua-stars-1-10", "language:lua filename:init.lua stars:1..10"),
    ("lua-stars-0", "language:lua filename:init.lua stars:0"),
    ("lua-created-2024", "language:lua filename:init.lua created:2024-01-01..2024-12-31"),
    ("lua-created-2023", "language:lua filename:init.lua created:2023-01-01..2023-12-31"),
    ("lua-created-2022", "language:lua filename:init.lua created:2022-01-01..2022-12-31"),
    ("lua-created-2021", "language:lua filename:init.lua created:2021-01-01..2021-12-31"),
    ("lua-created-pre2021", "language:lua filename:init.lua created:<2021-01-01"),
    ("lua-pushed-gt2024", "language:lua filename:init.lua pushed:>2024-01-01"),
    ("lua-pushed-2023", "language:lua filename:init.lua pushed:2023-01-01..2024-01-01"),
    ("lua-pushed-pre2023", "language:lua filename:init.lua pushed:<2023-01-01"),
    // Topic: neovim
    ("topic-neovim", "filename:init.lua topic:neovim"),
    ("topic-neovim-stars-gt100", "filename:init.lua topic:neovim stars:>100"),
    ("topic-neovim-stars-10-100", "filename:init.lua topic:neovim stars:10..100"),
    ("topic-neovim-stars-1-10", "filename:init.lua topic:neovim stars:1..10"),
    ("topic-neovim-stars-0", "filename:init.lua topic:neovim stars:0"),
    ("topic-neovim-created-gt2023", "filename:init.lua topic:neovim created:>2023-01-01"),
    ("topic-neovim-created-pre2023", "filename:init.lua topic:neovim created:<2023-01-01"),
    // Topic: dotfiles
    ("topic-dotfiles", "filename:init.lua topic:dotfiles"),
    ("topic-dotfiles-stars-gt50", "filename:init.lua topic:dotfiles stars:>50"),
    ("topic-dotfiles-stars-10-50", "filename:init.lua topic:dotfiles stars:10..50"),
    ("topic-dotfiles-stars-1-10", "filename:init.lua topic:dotfiles stars:1..10"),
    ("topic-dotfiles-stars-0", "filename:init.lua topic:dotfiles stars:0"),
    ("topic-dotfiles-created-gt2023", "filename:init.lua topic:dotfiles created:>2023-01-01"),
    ("topic-dotfiles-created-pre2023", "filename:init.lua topic:dotfiles created:<2023-01-01"),
    // Other vim-adjacent topics
    ("topic-vim", "filename:init.lua topic:vim"),
    ("topic-nvim", "filename:init.lua topic:nvim"),
    ("topic-lua", "filename:init.lua topic:lua"),
    ("topic-config", "filename:init.lua topic:config"),
    ("topic-configuration", "filename:init.lua topic:configuration"),
    // Language + topic combinations
    ("lua-topic-neovim", "language:lua topic:neovim"),
    ("lua-topic-nvim", "language:lua topic:nvim"),
    ("lua-topic-dotfiles", "language:lua topic:dotfiles"),
    ("lua-topic-vim", "language:lua topic:vim"),
    // Additional path variations
    ("path-lua", "filename:init.lua path:lua"),
    ("path-neovim", "filename:init.lua path:neovim"),
    ("path-dot-nvim", "filename:init.lua path:.nvim"),
    ("path-vim", "filename:init.lua path:vim"),
];

/// The built-in strategy set, in sweep order.
pub fn builtin_strategies() -> Vec<QueryStrategy> {
    BUILTIN
        .iter()
        .map(|(label, query)| QueryStrategy::new(label, query))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_labels_are_unique() {
        let strategies = builtin_strategies();
        let labels: BTreeSet<&str> = strategies.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels.len(), strategies.len());
    }

    #[test]
    fn test_queries_are_unique_and_nonempty() {
        let strategies = builtin_strategies();
        let queries: BTreeSet<&str> = strategies.iter().map(|s| s.query.as_str()).collect();
        assert_eq!(queries.len(), strategies.len());
        assert!(strategies.iter().all(|s| !s.query.trim().is_empty()));
    }

    #[test]
    fn test_sweep_starts_with_path_and_star_segments() {
        let strategies = builtin_strategies();
        assert!(strategies.len() >= 60);
        assert_eq!(strategies[0].query, "filename:init.lua path:.config/nvim");
        assert!(strategies.iter().any(|s| s.query.contains("stars:>1000")));
        assert!(strategies.iter().any(|s| s.query.contains("created:<2017-01-01")));
    }
}
