//! Full-statement detection and literal parameter substitution.
//!
//! Filters passed to the select/count/delete builders are usually fragments
//! (`"Views > 10"`), but a caller may hand over a complete statement instead.
//! Those are recognized by their leading keyword and passed through, so they
//! are never wrapped a second time.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use slimorm_core::{Error, Result, Value};

use crate::provider::DialectProvider;

/// Whether `sql` starts with `keyword` as a whole word, ignoring case and
/// leading whitespace.
pub fn starts_with_keyword(sql: &str, keyword: &str) -> bool {
    let trimmed = sql.trim_start();
    let Some(head) = trimmed.get(..keyword.len()) else {
        return false;
    };
    if !head.eq_ignore_ascii_case(keyword) {
        return false;
    }
    trimmed[keyword.len()..]
        .chars()
        .next()
        .is_none_or(|c| !(c.is_alphanumeric() || c == '_'))
}

pub fn is_full_select_statement(sql: &str) -> bool {
    starts_with_keyword(sql, "SELECT") || starts_with_keyword(sql, "WITH")
}

pub fn is_full_delete_statement(sql: &str) -> bool {
    starts_with_keyword(sql, "DELETE")
}

/// Whether a filter fragment already carries its own leading clause keyword,
/// in which case no `WHERE` is prepended.
pub fn has_leading_clause(filter: &str) -> bool {
    ["WHERE", "ORDER", "LIMIT"]
        .iter()
        .any(|kw| starts_with_keyword(filter, kw))
}

/// Append a filter fragment to `sql`, adding `WHERE` unless the fragment
/// already starts with `WHERE`, `ORDER` or `LIMIT`.
pub fn append_filter(sql: &mut String, filter: &str) {
    let filter = filter.trim();
    if filter.is_empty() {
        return;
    }
    if has_leading_clause(filter) {
        sql.push(' ');
    } else {
        sql.push_str(" WHERE ");
    }
    sql.push_str(filter);
}

/// A quoted string or identifier, or a `{N}` placeholder. Quoted regions
/// are matched first so placeholders inside them are left alone.
fn placeholder_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"'(?:[^']|'')*'|"[^"]*"|\{(\d+)\}"#).ok())
        .as_ref()
}

fn word_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"'(?:[^']|'')*'|"[^"]*"|[A-Za-z_][A-Za-z0-9_]*"#).ok())
        .as_ref()
}

/// Whether `keyword` appears in `sql` as a whole word outside string
/// literals and quoted identifiers, ignoring case.
pub fn contains_keyword(sql: &str, keyword: &str) -> bool {
    word_pattern().is_some_and(|pattern| {
        pattern
            .find_iter(sql)
            .any(|m| m.as_str().eq_ignore_ascii_case(keyword))
    })
}

/// Replace `{0}`, `{1}`, ... in `sql` with the quoted literal form of the
/// corresponding entry in `params`.
///
/// Placeholders inside string literals or quoted identifiers are kept as
/// written, so `Title LIKE '{0}%'` matches the text `{0}`. A placeholder
/// without a matching parameter is an error.
pub fn sql_fmt<D: DialectProvider + ?Sized>(dialect: &D, sql: &str, params: &[Value]) -> Result<String> {
    if params.is_empty() {
        return Ok(sql.to_string());
    }
    let Some(pattern) = placeholder_pattern() else {
        return Err(Error::Custom("placeholder pattern failed to compile".into()));
    };

    let mut failure = None;
    let out = pattern.replace_all(sql, |caps: &Captures<'_>| {
        let Some(index) = caps.get(1) else {
            return caps[0].to_string();
        };
        let literal = index
            .as_str()
            .parse::<usize>()
            .ok()
            .and_then(|i| params.get(i))
            .map(|v| dialect.quoted_value(v));
        match literal {
            Some(Ok(text)) => text,
            Some(Err(e)) => {
                failure.get_or_insert(e);
                String::new()
            }
            None => {
                failure.get_or_insert_with(|| {
                    Error::malformed(format!("no parameter for placeholder {}", &caps[0]), sql)
                });
                String::new()
            }
        }
    });
    match failure {
        Some(e) => Err(e),
        None => Ok(out.into_owned()),
    }
}
