//! Extraction tests against realistic whole configs

use eigenvim::extract::{extract, ParseOutcome, StructuralFact};

const REALISTIC_CONFIG: &str = r#"
-- bootstrap
vim.g.mapleader = " "
vim.g.maplocalleader = " "

vim.opt.number = true
vim.opt.relativenumber = true
vim.opt.tabstop = 4
vim.opt.clipboard = "unnamedplus"
vim.o.termguicolors = true
vim.wo.wrap = false

vim.keymap.set("n", "<leader>w", ":w<CR>", { desc = "save" })
vim.keymap.set({ "n", "v" }, "<leader>y", '"+y')

require("lazy").setup({
  "folke/tokyonight.nvim",
  { "nvim-telescope/telescope.nvim", dependencies = { "nvim-lua/plenary.nvim" } },
  {
    "nvim-treesitter/nvim-treesitter",
    build = ":TSUpdate",
  },
})

vim.cmd.colorscheme("tokyonight")
"#;

fn facts(source: &str) -> Vec<StructuralFact> {
    let (facts, outcome) = extract(source);
    assert_eq!(outcome, ParseOutcome::Parsed);
    facts
}

#[test]
fn test_realistic_config_full_extraction() {
    let facts = facts(REALISTIC_CONFIG);

    let settings: Vec<(&str, &str)> = facts
        .iter()
        .filter_map(|f| match f {
            StructuralFact::Setting { key, value, .. } => Some((key.as_str(), value.as_str())),
            _ => None,
        })
        .collect();
    assert!(settings.contains(&("number", "true")));
    assert!(settings.contains(&("tabstop", "4")));
    assert!(settings.contains(&("clipboard", "\"unnamedplus\"")));
    assert!(settings.contains(&("termguicolors", "true")));
    assert!(settings.contains(&("wrap", "false")));
    assert!(settings.contains(&("mapleader", "\" \"")));

    let keymaps: Vec<(&str, &str)> = facts
        .iter()
        .filter_map(|f| match f {
            StructuralFact::Keymap { mode, lhs, .. } => Some((mode.as_str(), lhs.as_str())),
            _ => None,
        })
        .collect();
    assert_eq!(keymaps, vec![("n", "<leader>w"), ("n,v", "<leader>y")]);

    let plugins: Vec<&str> = facts
        .iter()
        .filter_map(|f| match f {
            StructuralFact::PluginRef { repo, .. } => Some(repo.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        plugins,
        vec![
            "folke/tokyonight.nvim",
            "nvim-telescope/telescope.nvim",
            "nvim-lua/plenary.nvim",
            "nvim-treesitter/nvim-treesitter",
        ]
    );

    let colorschemes: Vec<&str> = facts
        .iter()
        .filter_map(|f| match f {
            StructuralFact::ColorschemeRef { name } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(colorschemes, vec!["tokyonight"]);
}

#[test]
fn test_extraction_is_idempotent() {
    assert_eq!(extract(REALISTIC_CONFIG), extract(REALISTIC_CONFIG));
}

#[test]
fn test_single_setting_yields_single_fact() {
    let facts = facts("vim.opt.number = true");
    assert_eq!(
        facts.len(),
        1,
        "expected exactly one fact, got {facts:?}"
    );
}

#[test]
fn test_colorscheme_forms_yield_identical_facts() {
    let forms = [
        "vim.cmd.colorscheme('gruvbox')",
        "vim.cmd.colorscheme \"gruvbox\"",
        "vim.cmd('colorscheme gruvbox')",
        "vim.cmd [[colorscheme gruvbox]]",
    ];
    let expected = facts(forms[0]);
    assert_eq!(
        expected,
        vec![StructuralFact::ColorschemeRef {
            name: "gruvbox".to_string()
        }]
    );
    for form in &forms[1..] {
        assert_eq!(facts(form), expected, "form {form:?} diverged");
    }
}

#[test]
fn test_packer_startup_block() {
    let source = r#"
        require("packer").startup(function(use)
            use "wbthomason/packer.nvim"
            use { "neovim/nvim-lspconfig" }
            use({ "hrsh7th/nvim-cmp", requires = { "hrsh7th/cmp-buffer" } })
        end)
    "#;
    let repos: Vec<String> = facts(source)
        .into_iter()
        .filter_map(|f| match f {
            StructuralFact::PluginRef { repo, .. } => Some(repo),
            _ => None,
        })
        .collect();
    assert_eq!(
        repos,
        vec![
            "wbthomason/packer.nvim",
            "neovim/nvim-lspconfig",
            "hrsh7th/nvim-cmp",
            "hrsh7th/cmp-buffer",
        ]
    );
}

#[test]
fn test_non_config_lua_yields_no_facts() {
    // A plain Lua module; parses fine but produces nothing.
    let (facts, outcome) = extract("local M = {}\nfunction M.hello() return 1 end\nreturn M");
    assert_eq!(outcome, ParseOutcome::Parsed);
    assert!(facts.is_empty());
}

#[test]
fn test_syntax_error_is_unparseable_not_fatal() {
    let (facts, outcome) = extract("vim.opt.number = = true ((");
    assert_eq!(outcome, ParseOutcome::Unparseable);
    assert!(facts.is_empty());
}

#[test]
fn test_urls_and_non_repo_strings_are_not_plugins() {
    let source = r#"
        require("lazy").setup({
            "folke/lazy.nvim",
            "https://github.com/owner/repo",
            "not-a-repo",
        })
    "#;
    let repos: Vec<String> = facts(source)
        .into_iter()
        .filter_map(|f| match f {
            StructuralFact::PluginRef { repo, .. } => Some(repo),
            _ => None,
        })
        .collect();
    assert_eq!(repos, vec!["folke/lazy.nvim"]);
}
