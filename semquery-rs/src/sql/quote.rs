//! Identifier and literal quoting for DuckDB SQL

use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").expect("number pattern is valid"));

/// Quote an identifier with double quotes, doubling embedded quotes
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a string literal with single quotes, doubling embedded quotes
pub fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Render a comparison operand: plain decimal numbers are emitted bare,
/// everything else as a string literal
pub fn literal(value: &str) -> String {
    if NUMBER.is_match(value) {
        value.to_string()
    } else {
        quote_string(value)
    }
}

/// Substring pattern for `ILIKE ... ESCAPE '\'`, with LIKE wildcards in the
/// value escaped
pub fn contains_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    quote_string(&format!("%{escaped}%"))
}

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("identifier pattern is valid")
});

static CALL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*\(").expect("call pattern is valid"));

/// Parenthesize an expression unless it is a plain (optionally qualified)
/// column such as `order_date` or a single call such as `SUM(order_amount)`
pub fn operand(sql_expression: &str) -> String {
    let trimmed = sql_expression.trim();
    if IDENTIFIER.is_match(trimmed) || is_single_call(trimmed) {
        trimmed.to_string()
    } else {
        format!("({trimmed})")
    }
}

/// `name(...)` where the first opening parenthesis closes at the last character
fn is_single_call(expr: &str) -> bool {
    if !CALL_NAME.is_match(expr) {
        return false;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    for (idx, c) in expr.char_indices() {
        match c {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth = match depth.checked_sub(1) {
                    Some(d) => d,
                    None => return false,
                };
                if depth == 0 {
                    return idx + 1 == expr.len();
                }
            }
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_string() {
        assert_eq!(quote_string("Books"), "'Books'");
        assert_eq!(quote_string("O'Brien"), "'O''Brien'");
        assert_eq!(quote_string("'; DROP TABLE x; --"), "'''; DROP TABLE x; --'");
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("orders_ds.total_revenue"), "\"orders_ds.total_revenue\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_literal() {
        assert_eq!(literal("100"), "100");
        assert_eq!(literal("-2.5"), "-2.5");
        assert_eq!(literal("1e9"), "'1e9'");
        assert_eq!(literal("100 OR 1=1"), "'100 OR 1=1'");
        assert_eq!(literal("2025-01-01"), "'2025-01-01'");
    }

    #[test]
    fn test_contains_pattern() {
        assert_eq!(contains_pattern("phone"), "'%phone%'");
        assert_eq!(contains_pattern("50%_off"), "'%50\\%\\_off%'");
        assert_eq!(contains_pattern("it's"), "'%it''s%'");
    }

    #[test]
    fn test_operand() {
        assert_eq!(operand("order_date"), "order_date");
        assert_eq!(operand("SUM(order_amount)"), "SUM(order_amount)");
        assert_eq!(operand("price * quantity"), "(price * quantity)");
        assert_eq!(operand("o.order_date"), "o.order_date");
        assert_eq!(operand("COUNT(*)"), "COUNT(*)");
        assert_eq!(operand("COALESCE(a, ')')"), "COALESCE(a, ')')");
    }

    #[test]
    fn test_operand_wraps_unspaced_compound_expressions() {
        assert_eq!(operand("a=b"), "(a=b)");
        assert_eq!(operand("price-cost"), "(price-cost)");
        assert_eq!(operand("SUM(a)/SUM(b)"), "(SUM(a)/SUM(b))");
        assert_eq!(operand("x::DATE"), "(x::DATE)");
        assert_eq!(operand("'a'||b"), "('a'||b)");
    }
}
