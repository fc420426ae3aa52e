//! Plugin specification recognizers
//!
//! Each plugin manager has its own spec shape; recognizers are independent
//! and tried in a fixed order, so adding a new manager means adding a shape
//! without touching the others.

use crate::extract::value::{lua_string_text, string_literal};
use crate::extract::{split_call, PluginSpecKind};
use full_moon::ast::{Call, Expression, Field, FunctionArgs, FunctionCall, TableConstructor};

/// A recognizer for one plugin manager's spec shape.
pub(crate) trait PluginShape {
    /// Returns the `owner/name` entries declared by this call, or None when
    /// the call does not match this shape.
    fn try_extract(&self, call: &FunctionCall) -> Option<Vec<(String, PluginSpecKind)>>;
}

/// Recognizers in evaluation order.
pub(crate) const SHAPES: &[&(dyn PluginShape + Sync)] = &[&LazySetup, &PackerUse];

/// `require("lazy").setup({ ... })`
pub(crate) struct LazySetup;

impl PluginShape for LazySetup {
    fn try_extract(&self, call: &FunctionCall) -> Option<Vec<(String, PluginSpecKind)>> {
        let (path, rest) = split_call(call)?;
        if path.as_slice() != ["require"] {
            return None;
        }
        let mut rest = rest.into_iter();
        if single_string_arg(rest.next()?)?.as_str() != "lazy" {
            return None;
        }
        // require("lazy").setup(<spec table>)
        let setup = rest.next()?;
        if !matches!(setup, SuffixShape::Dot(name) if name == "setup") {
            return None;
        }
        let table = match rest.next()? {
            SuffixShape::Call(args) => table_arg(args)?,
            _ => return None,
        };

        let mut repos = Vec::new();
        collect_lazy_specs(table, &mut repos);
        Some(
            repos
                .into_iter()
                .map(|repo| (repo, PluginSpecKind::Lazy))
                .collect(),
        )
    }
}

/// packer's `use("owner/name")` and `use { "owner/name", ... }`
pub(crate) struct PackerUse;

impl PluginShape for PackerUse {
    fn try_extract(&self, call: &FunctionCall) -> Option<Vec<(String, PluginSpecKind)>> {
        let (path, rest) = split_call(call)?;
        if path.as_slice() != ["use"] {
            return None;
        }
        let mut repos = Vec::new();
        match rest.into_iter().next()? {
            SuffixShape::Call(args) => match args {
                FunctionArgs::String(tok) => {
                    push_repo(&mut repos, &lua_string_text(&tok.token().to_string())?);
                }
                FunctionArgs::TableConstructor(table) => collect_packer_spec(table, &mut repos),
                FunctionArgs::Parentheses { arguments, .. } => {
                    match arguments.iter().next()? {
                        Expression::TableConstructor(table) => {
                            collect_packer_spec(table, &mut repos)
                        }
                        expr => push_repo(&mut repos, &string_literal(expr)?),
                    }
                }
                _ => return None,
            },
            _ => return None,
        }
        if repos.is_empty() {
            return None;
        }
        Some(
            repos
                .into_iter()
                .map(|repo| (repo, PluginSpecKind::Packer))
                .collect(),
        )
    }
}

/// Walks a lazy.nvim spec table: bare strings are specs, nested tables are
/// either specs (first positional element a string) or grouping tables, and
/// `dependencies` tables declare more specs.
fn collect_lazy_specs(table: &TableConstructor, out: &mut Vec<String>) {
    for field in table.fields() {
        match field {
            Field::NoKey(expr) => match expr {
                Expression::String(tok) => {
                    if let Some(text) = lua_string_text(&tok.token().to_string()) {
                        push_repo(out, &text);
                    }
                }
                Expression::TableConstructor(inner) => collect_lazy_specs(inner, out),
                _ => {}
            },
            Field::NameKey { key, value, .. } => {
                if key.token().to_string() == "dependencies" {
                    match value {
                        Expression::TableConstructor(inner) => collect_lazy_specs(inner, out),
                        Expression::String(tok) => {
                            if let Some(text) = lua_string_text(&tok.token().to_string()) {
                                push_repo(out, &text);
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
}

/// Walks a packer `use` table: the first positional string is the repo and
/// `requires` entries declare more.
fn collect_packer_spec(table: &TableConstructor, out: &mut Vec<String>) {
    for field in table.fields() {
        match field {
            Field::NoKey(Expression::String(tok)) => {
                if let Some(text) = lua_string_text(&tok.token().to_string()) {
                    push_repo(out, &text);
                }
            }
            Field::NameKey { key, value, .. } => {
                if key.token().to_string() == "requires" {
                    match value {
                        Expression::TableConstructor(inner) => collect_packer_spec(inner, out),
                        Expression::String(tok) => {
                            if let Some(text) = lua_string_text(&tok.token().to_string()) {
                                push_repo(out, &text);
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
}

fn push_repo(out: &mut Vec<String>, candidate: &str) {
    if looks_like_repo(candidate) {
        out.push(candidate.to_string());
    }
}

/// True when `candidate` plausibly names a GitHub repository: exactly one
/// slash, nonempty halves, a conservative charset, not a URL.
pub(crate) fn looks_like_repo(candidate: &str) -> bool {
    if candidate.starts_with("http") {
        return false;
    }
    let Some((owner, name)) = candidate.split_once('/') else {
        return false;
    };
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return false;
    }
    let valid = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-');
    owner.chars().all(valid) && name.chars().all(valid)
}

/// The shape of one trailing suffix: a dot-index name or a call's args.
pub(crate) enum SuffixShape<'a> {
    Dot(String),
    Call(&'a FunctionArgs),
}

/// Classifies a call suffix, ignoring brackets indexing and method calls.
pub(crate) fn suffix_shape(suffix: &full_moon::ast::Suffix) -> Option<SuffixShape<'_>> {
    use full_moon::ast::{Index, Suffix};
    match suffix {
        Suffix::Index(Index::Dot { name, .. }) => Some(SuffixShape::Dot(name.token().to_string())),
        Suffix::Call(Call::AnonymousCall(args)) => Some(SuffixShape::Call(args)),
        _ => None,
    }
}

/// The single string argument of a call suffix, any call form.
fn single_string_arg(shape: SuffixShape<'_>) -> Option<String> {
    match shape {
        SuffixShape::Call(args) => call_string_arg(args),
        SuffixShape::Dot(_) => None,
    }
}

/// The string argument of a call, covering `f("x")`, `f "x"` and `f [[x]]`.
pub(crate) fn call_string_arg(args: &FunctionArgs) -> Option<String> {
    match args {
        FunctionArgs::String(tok) => lua_string_text(&tok.token().to_string()),
        FunctionArgs::Parentheses { arguments, .. } => string_literal(arguments.iter().next()?),
        _ => None,
    }
}

/// The table argument of a call, covering `f({...})` and `f {...}`.
fn table_arg(args: &FunctionArgs) -> Option<&TableConstructor> {
    match args {
        FunctionArgs::TableConstructor(table) => Some(table),
        FunctionArgs::Parentheses { arguments, .. } => match arguments.iter().next()? {
            Expression::TableConstructor(table) => Some(table),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_repo() {
        assert!(looks_like_repo("folke/lazy.nvim"));
        assert!(looks_like_repo("nvim-telescope/telescope.nvim"));
        assert!(!looks_like_repo("telescope"));
        assert!(!looks_like_repo("https://github.com/folke/lazy.nvim"));
        assert!(!looks_like_repo("a/b/c"));
        assert!(!looks_like_repo("/nvim"));
        assert!(!looks_like_repo("owner/"));
        assert!(!looks_like_repo("owner/name with space"));
    }
}
