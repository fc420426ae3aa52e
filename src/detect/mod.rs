//! Neovim-config detection
//!
//! The crawl's filename queries also surface `init.lua` files for AwesomeWM,
//! Hammerspoon, LÖVE games, wezterm and plain Lua libraries. Before a file
//! enters aggregation it is scored by regex evidence: positive patterns
//! (the `vim.*` API, plugin-manager and popular-plugin requires, editor
//! vocabulary) raise confidence, negative patterns (other Lua ecosystems)
//! lower it. Files below the threshold are skipped and counted separately.

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

/// Default confidence cutoff.
pub const DEFAULT_DETECTION_THRESHOLD: f64 = 0.5;

const POSITIVE_PATTERNS: &[&str] = &[
    // Core vim.* API
    r"\bvim\.opt\b",
    r"\bvim\.o\b",
    r"\bvim\.g\b",
    r"\bvim\.bo\b",
    r"\bvim\.wo\b",
    r"\bvim\.go\b",
    r"\bvim\.api\b",
    r"\bvim\.fn\b",
    r"\bvim\.cmd\b",
    r"\bvim\.keymap\b",
    r"\bvim\.lsp\b",
    r"\bvim\.treesitter\b",
    r"\bvim\.diagnostic\b",
    r"\bvim\.highlight\b",
    r"\bvim\.loop\b",
    r"\bvim\.uv\b",
    r"\bvim\.schedule\b",
    r"\bvim\.defer_fn\b",
    r"\bvim\.notify\b",
    r"\bvim\.inspect\b",
    r"\bvim\.tbl_",
    r"\bvim\.validate\b",
    r"\bvim\.env\b",
    // Plugin managers
    r#"require\s*\(\s*["']lazy["']"#,
    r#"require\s*\(\s*["']packer["']"#,
    r"Packer\s*\{",
    r"lazy\.setup\s*\(",
    r"packer\.startup\s*\(",
    // Popular plugins
    r#"require\s*\(\s*["']lspconfig["']"#,
    r#"require\s*\(\s*["']nvim-lspconfig["']"#,
    r#"require\s*\(\s*["']telescope["']"#,
    r#"require\s*\(\s*["']nvim-cmp["']"#,
    r#"require\s*\(\s*["']cmp["']"#,
    r#"require\s*\(\s*["']nvim-treesitter["']"#,
    r#"require\s*\(\s*["']treesitter["']"#,
    r#"require\s*\(\s*["']mason["']"#,
    r#"require\s*\(\s*["']which-key["']"#,
    r#"require\s*\(\s*["']neo-tree["']"#,
    r#"require\s*\(\s*["']nvim-tree["']"#,
    r#"require\s*\(\s*["']lualine["']"#,
    r#"require\s*\(\s*["']bufferline["']"#,
    r#"require\s*\(\s*["']gitsigns["']"#,
    r#"require\s*\(\s*["']null-ls["']"#,
    r#"require\s*\(\s*["']none-ls["']"#,
    r#"require\s*\(\s*["']luasnip["']"#,
    r#"require\s*\(\s*["']mini\."#,
    // Editor vocabulary
    r"\bcolorscheme\b",
    r"\bmapleader\b",
    r"\blocalleader\b",
    r"\baugroup\b",
    r"\bautocmd\b",
    r"\bnvim_create_autocmd\b",
    r"\bnvim_set_keymap\b",
    r"\bnvim_buf_set_keymap\b",
];

const NEGATIVE_PATTERNS: &[&str] = &[
    // AwesomeWM
    r"\bawful\.",
    r"\bwibox\.",
    r"\bbeautiful\.",
    r"\bnaughty\.",
    r"\bgears\.",
    r"\bruled\.",
    r"\bmenubar\.",
    r#"require\s*\(\s*["']awful["']"#,
    r#"require\s*\(\s*["']wibox["']"#,
    r#"require\s*\(\s*["']beautiful["']"#,
    r#"require\s*\(\s*["']naughty["']"#,
    r#"require\s*\(\s*["']gears["']"#,
    // LOVE game engine
    r"\blove\.load\b",
    r"\blove\.update\b",
    r"\blove\.draw\b",
    r"\blove\.keypressed\b",
    r"\blove\.graphics\b",
    r"\blove\.audio\b",
    r"\blove\.physics\b",
    // Plain Lua module shapes
    r"^return\s+\w+\s*$",
    r"^local\s+M\s*=\s*\{\s*\}",
    // OpenResty/nginx
    r"\bngx\.",
    r"\bngx\.req\b",
    r"\bngx\.resp\b",
    // Luarocks/library
    r"rockspec_format",
    r"package\.loaded",
    // Hammerspoon
    r"\bhs\.",
    r"\bhs\.hotkey\b",
    r"\bhs\.window\b",
    // Wezterm
    r"\bwezterm\.",
    r#"require\s*\(\s*["']wezterm["']"#,
    // Conky
    r"\bconky\.",
    // mpv
    r"\bmp\.",
    r"\bmp\.command\b",
    r"\bmp\.observe_property\b",
];

static POSITIVE: LazyLock<Vec<Regex>> = LazyLock::new(|| compile(POSITIVE_PATTERNS));
static NEGATIVE: LazyLock<Vec<Regex>> = LazyLock::new(|| compile(NEGATIVE_PATTERNS));
static MODULE_RETURN: LazyLock<Regex> =
    LazyLock::new(|| RegexBuilder::new(r"^return\s+\{").multi_line(true).build().unwrap());

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .multi_line(true)
                .build()
                .unwrap_or_else(|e| panic!("invalid detection pattern {p:?}: {e}"))
        })
        .collect()
}

/// Detection verdict for one config.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub is_neovim: bool,
    /// 0.0 to 1.0
    pub confidence: f64,
    pub positive_matches: usize,
    pub negative_matches: usize,
}

/// Scores `content` against the pattern sets.
///
/// Scoring: three or more positive matches give a full positive score;
/// every negative match subtracts 0.3 (capped at 0.9), softened to 30%
/// when any `vim.*` API evidence is present. Negative-only files, empty
/// files, and very short files without positives score 0.0; a bare
/// `return { ... }` module without positives scores 0.1.
pub fn is_neovim_config(content: &str, threshold: f64) -> Detection {
    if content.trim().is_empty() {
        return Detection {
            is_neovim: false,
            confidence: 0.0,
            positive_matches: 0,
            negative_matches: 0,
        };
    }

    let positive: Vec<&Regex> = POSITIVE.iter().filter(|re| re.is_match(content)).collect();
    let negative_matches = NEGATIVE.iter().filter(|re| re.is_match(content)).count();
    let positive_matches = positive.len();

    if negative_matches > 0 && positive_matches == 0 {
        return Detection {
            is_neovim: false,
            confidence: 0.0,
            positive_matches,
            negative_matches,
        };
    }

    let positive_score = (positive_matches as f64 / 3.0).min(1.0);
    let mut negative_penalty = (negative_matches as f64 * 0.3).min(0.9);
    if positive.iter().any(|re| re.as_str().contains(r"vim\.")) {
        negative_penalty *= 0.3;
    }
    let mut confidence = (positive_score - negative_penalty).max(0.0);

    if positive_matches == 0 && MODULE_RETURN.is_match(content) {
        confidence = 0.1;
    }
    if positive_matches == 0 && content.trim().len() < 50 {
        confidence = 0.0;
    }

    Detection {
        is_neovim: confidence >= threshold,
        confidence,
        positive_matches,
        negative_matches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(content: &str) -> Detection {
        is_neovim_config(content, DEFAULT_DETECTION_THRESHOLD)
    }

    #[test]
    fn test_typical_config_passes() {
        let detection = detect(
            "vim.opt.number = true\nvim.keymap.set('n', '<leader>w', ':w<CR>')\nvim.cmd.colorscheme('nord')",
        );
        assert!(detection.is_neovim);
        assert!(detection.confidence >= 0.9);
    }

    #[test]
    fn test_awesomewm_config_fails() {
        let detection = detect(
            "local awful = require(\"awful\")\nlocal wibox = require(\"wibox\")\nawful.rules.rules = {}",
        );
        assert!(!detection.is_neovim);
        assert_eq!(detection.confidence, 0.0);
    }

    #[test]
    fn test_empty_content() {
        let detection = detect("   \n  ");
        assert!(!detection.is_neovim);
        assert_eq!(detection.confidence, 0.0);
    }

    #[test]
    fn test_bare_module_return_scores_low() {
        let detection = detect(
            "return {\n  some_field = 1,\n  other_field = 'x',\n  third_field = { 1, 2, 3 },\n}\n",
        );
        assert!(!detection.is_neovim);
        assert!((detection.confidence - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_short_file_without_evidence() {
        let detection = detect("print('hi')");
        assert!(!detection.is_neovim);
        assert_eq!(detection.confidence, 0.0);
    }

    #[test]
    fn test_vim_api_softens_negative_evidence() {
        // The mpv-style `mp.` pattern alone would cost 0.3; with vim.* API
        // evidence present the penalty shrinks and the file still passes.
        let content = "vim.opt.number = true\nvim.keymap.set('n', 'q', ':q<CR>')\nvim.g.x = 1\nlocal mp = 1 -- mp. mention\n";
        let with_vim = is_neovim_config(content, 0.5);
        assert!(with_vim.is_neovim);
    }
}
