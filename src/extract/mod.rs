//! Structural extraction from Lua configurations
//!
//! Parses each config with `full_moon` into a real syntax tree and walks it
//! with a visitor, so facts come from structure rather than regex guesses:
//! - `Setting`: assignments to `vim.opt`/`vim.o`/`vim.go`/`vim.bo`/`vim.wo`/
//!   `vim.g` dotted (or bracket-string) paths
//! - `Keymap`: `vim.keymap.set(...)` calls
//! - `PluginRef`: lazy.nvim and packer spec shapes
//! - `ColorschemeRef`: `vim.cmd.colorscheme`, `vim.cmd "colorscheme x"`, and
//!   requires of well-known colorscheme modules
//!
//! Anything unrecognized is ignored; a file that does not parse yields an
//! empty fact list and `ParseOutcome::Unparseable`, never an error.

mod plugins;
mod value;

pub use value::render_value;

use full_moon::ast::{
    Assignment, Expression, Field, FunctionCall, Index, Prefix, Suffix, Var,
};
use full_moon::visitors::Visitor;
use plugins::{call_string_arg, suffix_shape, SuffixShape, SHAPES};
use value::string_literal;

/// Whether the source parsed as Lua.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    Parsed,
    /// Syntax error; the config contributed no facts and is excluded from
    /// percentage denominators downstream.
    Unparseable,
}

/// Namespace a setting was assigned under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingScope {
    Opt,
    O,
    Go,
    Bo,
    Wo,
    /// `vim.g`
    Global,
}

impl SettingScope {
    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "opt" => Some(Self::Opt),
            "o" => Some(Self::O),
            "go" => Some(Self::Go),
            "bo" => Some(Self::Bo),
            "wo" => Some(Self::Wo),
            "g" => Some(Self::Global),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opt => "opt",
            Self::O => "o",
            Self::Go => "go",
            Self::Bo => "bo",
            Self::Wo => "wo",
            Self::Global => "g",
        }
    }
}

/// Which manager's shape produced a plugin reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginSpecKind {
    Lazy,
    Packer,
}

/// One extracted fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralFact {
    Setting {
        scope: SettingScope,
        key: String,
        /// Canonical rendering; see `render_value`.
        value: String,
    },
    Keymap {
        /// Mode string, or table-of-strings joined with `,`.
        mode: String,
        lhs: String,
        /// Only kept when the rhs is a string literal.
        rhs: Option<String>,
    },
    PluginRef {
        /// `owner/name`
        repo: String,
        kind: PluginSpecKind,
    },
    ColorschemeRef {
        name: String,
    },
}

/// Extracts all structural facts from one config source.
///
/// Pure and deterministic: identical input gives identical facts in
/// identical order, so it is safe to run concurrently across configs.
pub fn extract(source: &str) -> (Vec<StructuralFact>, ParseOutcome) {
    let ast = match full_moon::parse(source) {
        Ok(ast) => ast,
        Err(_) => return (Vec::new(), ParseOutcome::Unparseable),
    };
    let mut visitor = FactVisitor::default();
    visitor.visit_ast(&ast);
    (visitor.facts, ParseOutcome::Parsed)
}

#[derive(Default)]
struct FactVisitor {
    facts: Vec<StructuralFact>,
}

impl Visitor for FactVisitor {
    fn visit_assignment(&mut self, node: &Assignment) {
        // Multi-assignment pairs variables with expressions positionally;
        // unpaired variables carry no recoverable value.
        for (var, expr) in node.variables().iter().zip(node.expressions().iter()) {
            if let Some(fact) = setting_from(var, expr) {
                self.facts.push(fact);
            }
        }
    }

    fn visit_function_call(&mut self, node: &FunctionCall) {
        for shape in SHAPES {
            if let Some(refs) = shape.try_extract(node) {
                for (repo, kind) in refs {
                    self.facts.push(StructuralFact::PluginRef { repo, kind });
                }
                return;
            }
        }

        let Some((path, rest)) = split_call(node) else {
            return;
        };
        let segments: Vec<&str> = path.iter().map(String::as_str).collect();
        match segments.as_slice() {
            ["vim", "keymap", "set"] => {
                if let Some(fact) = keymap_from(&rest) {
                    self.facts.push(fact);
                }
            }
            ["vim", "cmd", "colorscheme"] => {
                if let Some(SuffixShape::Call(args)) = rest.first() {
                    if let Some(name) = call_string_arg(args) {
                        self.push_colorscheme(&name);
                    }
                }
            }
            ["vim", "cmd"] => {
                if let Some(SuffixShape::Call(args)) = rest.first() {
                    if let Some(command) = call_string_arg(args) {
                        if let Some(name) = colorscheme_from_command(&command) {
                            self.push_colorscheme(&name);
                        }
                    }
                }
            }
            ["require"] => {
                if let Some(name) = colorscheme_from_require(&rest) {
                    self.facts
                        .push(StructuralFact::ColorschemeRef { name: name.to_string() });
                }
            }
            _ => {}
        }
    }
}

impl FactVisitor {
    fn push_colorscheme(&mut self, name: &str) {
        let name = name.trim();
        if name.len() > 1 && !COLORSCHEME_FALSE_POSITIVES.contains(&name.to_lowercase().as_str()) {
            self.facts.push(StructuralFact::ColorschemeRef {
                name: name.to_string(),
            });
        }
    }
}

/// Builds a `Setting` from one variable/expression pair, or None when the
/// target is not a `vim.<scope>.<key>` path.
fn setting_from(var: &Var, expr: &Expression) -> Option<StructuralFact> {
    let path = var_path(var)?;
    if path.len() < 3 || path[0] != "vim" {
        return None;
    }
    let scope = SettingScope::from_segment(&path[1])?;
    Some(StructuralFact::Setting {
        scope,
        key: path[2..].join("."),
        value: render_value(expr),
    })
}

/// Flattens an assignment target into name segments.
///
/// Dot indexing and bracket indexing with a string literal both contribute a
/// segment; a call or computed index anywhere makes the target dynamic and
/// yields None.
fn var_path(var: &Var) -> Option<Vec<String>> {
    match var {
        Var::Name(tok) => Some(vec![tok.token().to_string()]),
        Var::Expression(var_expr) => {
            let mut path = match var_expr.prefix() {
                Prefix::Name(tok) => vec![tok.token().to_string()],
                _ => return None,
            };
            for suffix in var_expr.suffixes() {
                match suffix {
                    Suffix::Index(Index::Dot { name, .. }) => {
                        path.push(name.token().to_string());
                    }
                    Suffix::Index(Index::Brackets { expression, .. }) => {
                        path.push(string_literal(expression)?);
                    }
                    _ => return None,
                }
            }
            Some(path)
        }
        _ => None,
    }
}

/// Splits a function call into its leading dotted name path and the suffixes
/// from the first call onward.
///
/// `require("lazy").setup {}` gives `(["require"], [Call, Dot("setup"),
/// Call])`; method calls and computed indexing yield None.
pub(crate) fn split_call(call: &FunctionCall) -> Option<(Vec<String>, Vec<SuffixShape<'_>>)> {
    let mut path = match call.prefix() {
        Prefix::Name(tok) => vec![tok.token().to_string()],
        _ => return None,
    };
    let mut rest = Vec::new();
    let mut in_head = true;
    for suffix in call.suffixes() {
        match suffix_shape(suffix)? {
            SuffixShape::Dot(name) if in_head => path.push(name),
            shape => {
                in_head = false;
                rest.push(shape);
            }
        }
    }
    if rest.is_empty() {
        return None;
    }
    Some((path, rest))
}

/// Builds a `Keymap` from the arguments of `vim.keymap.set`.
fn keymap_from(rest: &[SuffixShape<'_>]) -> Option<StructuralFact> {
    let SuffixShape::Call(args) = rest.first()? else {
        return None;
    };
    let full_moon::ast::FunctionArgs::Parentheses { arguments, .. } = args else {
        return None;
    };
    let mut arguments = arguments.iter();
    let mode = mode_text(arguments.next()?)?;
    let lhs = string_literal(arguments.next()?)?;
    let rhs = arguments.next().and_then(string_literal);
    Some(StructuralFact::Keymap { mode, lhs, rhs })
}

/// Renders the mode argument: a string, or a table of strings joined with
/// `,`.
fn mode_text(expr: &Expression) -> Option<String> {
    if let Some(text) = string_literal(expr) {
        return Some(text);
    }
    if let Expression::TableConstructor(table) = expr {
        let mut modes = Vec::new();
        for field in table.fields() {
            match field {
                Field::NoKey(inner) => modes.push(string_literal(inner)?),
                _ => return None,
            }
        }
        if !modes.is_empty() {
            return Some(modes.join(","));
        }
    }
    None
}

/// Pulls a colorscheme name out of a `vim.cmd` command string.
fn colorscheme_from_command(command: &str) -> Option<String> {
    for line in command.lines() {
        let mut words = line.split_whitespace();
        if words.next() == Some("colorscheme") {
            return words.next().map(str::to_string);
        }
    }
    None
}

/// Matches `require("<module>")` where the module is a well-known
/// colorscheme, used bare or followed by `.setup`/`.load`.
fn colorscheme_from_require(rest: &[SuffixShape<'_>]) -> Option<&'static str> {
    let SuffixShape::Call(args) = rest.first()? else {
        return None;
    };
    let module = call_string_arg(args)?;
    let name = KNOWN_COLORSCHEMES
        .iter()
        .find(|(known, _)| *known == module)
        .map(|(_, display)| *display)?;
    match rest.get(1) {
        None => Some(name),
        Some(SuffixShape::Dot(method)) if method == "setup" || method == "load" => Some(name),
        Some(_) => None,
    }
}

/// Require-module name to display name for popular colorscheme plugins.
const KNOWN_COLORSCHEMES: &[(&str, &str)] = &[
    ("tokyonight", "tokyonight"),
    ("tokyonight.nvim", "tokyonight"),
    ("catppuccin", "catppuccin"),
    ("gruvbox", "gruvbox"),
    ("gruvbox-material", "gruvbox-material"),
    ("onedark", "onedark"),
    ("onedarkpro", "onedark"),
    ("rose-pine", "rose-pine"),
    ("dracula", "dracula"),
    ("nord", "nord"),
    ("nightfox", "nightfox"),
    ("kanagawa", "kanagawa"),
    ("everforest", "everforest"),
    ("material", "material"),
    ("monokai", "monokai"),
    ("solarized", "solarized"),
    ("github-theme", "github"),
    ("vscode", "vscode"),
    ("one_monokai", "monokai"),
    ("ayu", "ayu"),
    ("melange", "melange"),
    ("oxocarbon", "oxocarbon"),
    ("cyberdream", "cyberdream"),
    ("bamboo", "bamboo"),
    ("lackluster", "lackluster"),
    ("fluoromachine", "fluoromachine"),
    ("moonfly", "moonfly"),
    ("nightfly", "nightfly"),
    ("sonokai", "sonokai"),
    ("edge", "edge"),
    ("aurora", "aurora"),
    ("palenight", "palenight"),
    ("onehalf", "onehalf"),
    ("jellybeans", "jellybeans"),
    ("molokai", "molokai"),
    ("iceberg", "iceberg"),
    ("tender", "tender"),
    ("srcery", "srcery"),
    ("vim-monokai-tasty", "monokai"),
    ("vim-one", "one"),
    ("papercolor", "papercolor"),
    ("base16", "base16"),
    ("doom-one", "doom-one"),
    ("onenord", "onenord"),
    ("zephyr", "zephyr"),
];

/// Words that the loose `colorscheme <word>` command scan must not mistake
/// for a scheme name.
const COLORSCHEME_FALSE_POSITIVES: &[&str] = &[
    "vim", "cmd", "colorscheme", "that", "the", "a", "an", "my", "your", "this", "new", "old",
    "default", "custom", "config",
];
