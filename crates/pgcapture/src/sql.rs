//! SQL text helpers: parameter rendering, placeholder interpolation and display formatting.
//!
//! None of this is a SQL parser. Interpolation only understands `$N` placeholders and
//! single-quoted literals; formatting only upper-cases known keywords and breaks lines
//! before the major clauses.

use colored::{Color, Colorize};
use tokio_postgres::types::ToSql;

const KEYWORDS: &[&str] = &[
    "ALL", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CONFLICT", "CROSS", "DEFAULT", "DELETE",
    "DESC", "DISTINCT", "DO", "ELSE", "END", "EXISTS", "FROM", "FULL", "GROUP", "HAVING", "ILIKE",
    "IN", "INNER", "INSERT", "INTO", "IS", "JOIN", "LEFT", "LIKE", "LIMIT", "NOT", "NOTHING",
    "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER", "RETURNING", "RIGHT", "SELECT", "SET", "THEN",
    "UNION", "UPDATE", "VALUES", "WHEN", "WHERE", "WITH",
];

const JOIN_QUALIFIERS: &[&str] = &["LEFT", "RIGHT", "INNER", "FULL", "CROSS", "OUTER"];

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// Truncate `sql` to at most `max_chars` characters, appending `...` when anything was cut.
pub fn truncate_sql(sql: &str, max_chars: usize) -> String {
    match sql.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &sql[..end]),
        None => sql.to_string(),
    }
}

/// Render a bound parameter for display.
///
/// Uses the parameter's `Debug` output: quoted strings become single-quoted SQL
/// literals, `None` becomes `NULL` and `Some(x)` renders as `x`.
pub fn render_param(param: &(dyn ToSql + Sync)) -> String {
    render_debug(&format!("{param:?}"))
}

fn render_debug(debug: &str) -> String {
    if debug == "None" {
        return "NULL".to_string();
    }
    if let Some(inner) = debug
        .strip_prefix("Some(")
        .and_then(|s| s.strip_suffix(')'))
    {
        return render_debug(inner);
    }
    if debug.len() >= 2 && debug.starts_with('"') && debug.ends_with('"') {
        let inner = unescape_debug(&debug[1..debug.len() - 1]);
        return format!("'{}'", inner.replace('\'', "''"));
    }
    debug.to_string()
}

/// Undo the escapes `str::escape_debug` produces.
fn unescape_debug(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some('u') => {
                let rest = chars.as_str();
                let decoded = rest
                    .strip_prefix('{')
                    .and_then(|r| r.split_once('}'))
                    .and_then(|(hex, tail)| {
                        let c = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)?;
                        Some((c, tail))
                    });
                match decoded {
                    Some((c, tail)) => {
                        out.push(c);
                        chars = tail.chars();
                    }
                    None => out.push_str("\\u"),
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Substitute `$N` placeholders with the N-th rendered parameter.
///
/// Placeholders inside single-quoted literals and indices without a matching
/// parameter are left untouched.
pub fn interpolate(sql: &str, params: &[String]) -> String {
    if params.is_empty() {
        return sql.to_string();
    }

    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.char_indices().peekable();
    let mut in_literal = false;

    while let Some((i, c)) = chars.next() {
        match c {
            '\'' => {
                in_literal = !in_literal;
                out.push(c);
            }
            '$' if !in_literal => {
                let start = i + 1;
                let mut end = start;
                while let Some(&(j, d)) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    end = j + 1;
                    chars.next();
                }
                let value = sql[start..end]
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|n| params.get(n));
                match value {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&sql[i..end]),
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Split on whitespace, keeping single-quoted literals intact.
fn tokenize(sql: &str) -> Vec<&str> {
    let bytes = sql.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
            if bytes[i] == b'\'' {
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == b'\'' {
                        if i + 1 < bytes.len() && bytes[i + 1] == b'\'' {
                            i += 2;
                            continue;
                        }
                        break;
                    }
                    i += 1;
                }
            }
            i += 1;
        }
        let end = i.min(bytes.len());
        tokens.push(&sql[start..end]);
    }
    tokens
}

fn breaks_before(token: &str, prev: &str, next: Option<&str>) -> bool {
    match token {
        "FROM" | "WHERE" | "HAVING" | "LIMIT" | "OFFSET" | "VALUES" | "SET" | "RETURNING"
        | "UNION" => true,
        "GROUP" | "ORDER" => next == Some("BY"),
        "LEFT" | "RIGHT" | "INNER" | "FULL" | "CROSS" => matches!(next, Some("JOIN" | "OUTER")),
        "JOIN" => !JOIN_QUALIFIERS.contains(&prev),
        _ => false,
    }
}

/// Format SQL for display: keywords upper-cased (optionally colored) and major
/// clauses on their own line.
pub fn format_sql(sql: &str, keyword_color: Option<Color>) -> String {
    let tokens = tokenize(sql);
    let upper: Vec<String> = tokens.iter().map(|t| t.to_ascii_uppercase()).collect();

    let mut out = String::with_capacity(sql.len() + 16);
    for (pos, token) in tokens.iter().enumerate() {
        let word = upper[pos].as_str();
        if pos > 0 {
            let next = upper.get(pos + 1).map(String::as_str);
            if breaks_before(word, &upper[pos - 1], next) {
                out.push('\n');
            } else {
                out.push(' ');
            }
        }

        if KEYWORDS.contains(&word) {
            match keyword_color {
                Some(color) => out.push_str(&word.color(color).to_string()),
                None => out.push_str(word),
            }
        } else {
            out.push_str(token);
        }
    }
    out
}
