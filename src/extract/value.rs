//! Canonical value rendering
//!
//! Aggregation compares values as strings, so equal Lua values must render
//! identically regardless of source formatting: strings are uniformly
//! double-quoted whatever quote style the author used, tables keep their
//! source field order, and anything else falls back to whitespace-squished
//! token text with comments dropped.

use full_moon::ast::{Expression, Field, TableConstructor, UnOp};
use full_moon::node::Node;

/// Renders an expression into its canonical string form.
pub fn render_value(expr: &Expression) -> String {
    match expr {
        Expression::Symbol(tok) | Expression::Number(tok) => tok.token().to_string(),
        Expression::String(tok) => {
            let raw = tok.token().to_string();
            format!("\"{}\"", lua_string_text(&raw).unwrap_or(raw))
        }
        Expression::TableConstructor(table) => render_table(table),
        Expression::Parentheses { expression, .. } => render_value(expression),
        Expression::UnaryOperator { unop, expression, .. } => match unop {
            UnOp::Minus(_) => format!("-{}", render_value(expression)),
            UnOp::Not(_) => format!("not {}", render_value(expression)),
            UnOp::Hash(_) => format!("#{}", render_value(expression)),
            _ => squish(expr),
        },
        _ => squish(expr),
    }
}

/// Renders a table literal as `{k = v, ...}` in source field order.
fn render_table(table: &TableConstructor) -> String {
    let mut parts = Vec::new();
    for field in table.fields() {
        match field {
            Field::NameKey { key, value, .. } => {
                parts.push(format!("{} = {}", key.token(), render_value(value)));
            }
            Field::ExpressionKey { key, value, .. } => {
                parts.push(format!("[{}] = {}", render_value(key), render_value(value)));
            }
            Field::NoKey(value) => parts.push(render_value(value)),
            _ => {}
        }
    }
    format!("{{{}}}", parts.join(", "))
}

/// Whitespace-squished, comment-free source text of any node.
pub fn squish<N: Node>(node: &N) -> String {
    node.tokens()
        .map(|t| t.token().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The text content of a Lua string literal, any quoting form.
///
/// Handles `'...'`, `"..."`, and long brackets `[[...]]` / `[=[...]=]`.
/// Returns None when `raw` is not a recognizable string literal.
pub fn lua_string_text(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.len() >= 2
        && ((raw.starts_with('"') && raw.ends_with('"'))
            || (raw.starts_with('\'') && raw.ends_with('\'')))
    {
        return Some(raw[1..raw.len() - 1].to_string());
    }
    if let Some(rest) = raw.strip_prefix('[') {
        let level = rest.chars().take_while(|c| *c == '=').count();
        let eqs = "=".repeat(level);
        let open = format!("[{eqs}[");
        let close = format!("]{eqs}]");
        if raw.len() >= open.len() + close.len()
            && raw.starts_with(&open)
            && raw.ends_with(&close)
        {
            return Some(raw[open.len()..raw.len() - close.len()].to_string());
        }
    }
    None
}

/// The text of an expression that is a string literal, or None.
pub fn string_literal(expr: &Expression) -> Option<String> {
    match expr {
        Expression::String(tok) => lua_string_text(&tok.token().to_string()),
        Expression::Parentheses { expression, .. } => string_literal(expression),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_assigned_value(source: &str) -> Expression {
        let ast = full_moon::parse(source).unwrap();
        for stmt in ast.nodes().stmts() {
            if let full_moon::ast::Stmt::Assignment(assignment) = stmt {
                return assignment.expressions().iter().next().unwrap().clone();
            }
        }
        panic!("no assignment in {source:?}");
    }

    #[test]
    fn test_booleans_and_numbers_render_verbatim() {
        assert_eq!(render_value(&first_assigned_value("x = true")), "true");
        assert_eq!(render_value(&first_assigned_value("x = nil")), "nil");
        assert_eq!(render_value(&first_assigned_value("x = 42")), "42");
        assert_eq!(render_value(&first_assigned_value("x = 0.5")), "0.5");
    }

    #[test]
    fn test_strings_normalize_to_double_quotes() {
        assert_eq!(render_value(&first_assigned_value("x = 'abc'")), "\"abc\"");
        assert_eq!(render_value(&first_assigned_value("x = \"abc\"")), "\"abc\"");
        assert_eq!(render_value(&first_assigned_value("x = [[abc]]")), "\"abc\"");
    }

    #[test]
    fn test_negative_number() {
        assert_eq!(render_value(&first_assigned_value("x = -1")), "-1");
    }

    #[test]
    fn test_table_keeps_source_order() {
        let rendered = render_value(&first_assigned_value("x = { b = 2, a = 1, 'z' }"));
        assert_eq!(rendered, "{b = 2, a = 1, \"z\"}");
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(render_value(&first_assigned_value("x = {}")), "{}");
    }

    #[test]
    fn test_lua_string_text_forms() {
        assert_eq!(lua_string_text("\"a\""), Some("a".to_string()));
        assert_eq!(lua_string_text("'a'"), Some("a".to_string()));
        assert_eq!(lua_string_text("[[a]]"), Some("a".to_string()));
        assert_eq!(lua_string_text("[=[a]=]"), Some("a".to_string()));
        assert_eq!(lua_string_text("42"), None);
    }
}
