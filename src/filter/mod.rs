//! Filter token parsing.
//!
//! Each positional command-line argument is a `FIELD=FILTER` token. The value
//! part decides the kind of filter:
//!
//! - `/pattern/` - regex match, pattern compiled without flags
//! - `[a,b,c]` - set membership
//! - anything else - exact string match
//!
//! # Example
//!
//! ```
//! use optical_core::filter::{FilterKind, parse_filter};
//!
//! let filter = parse_filter("role=/^web/").unwrap();
//! assert_eq!(filter.key, "role");
//! assert!(matches!(filter.kind, FilterKind::Regex(ref re) if re.as_str() == "^web"));
//! ```

mod error;

pub use error::FilterError;

use indexmap::IndexMap;
use regex::Regex;
use tracing::debug;

/// Filters keyed by field name, in the order they were first given.
pub type FilterMap = IndexMap<String, Filter>;

/// A single field constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Record field the filter applies to. Never empty.
    pub key: String,
    /// How the field value is matched.
    pub kind: FilterKind,
}

/// The predicate part of a [`Filter`].
#[derive(Debug, Clone)]
pub enum FilterKind {
    /// Field must equal the literal string.
    Exact(String),
    /// Field must match the pattern (unanchored).
    Regex(Regex),
    /// Field must be one of the members. An empty set matches nothing.
    Set(Vec<String>),
}

impl Filter {
    /// Creates an exact-match filter.
    #[must_use]
    pub fn exact(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: FilterKind::Exact(value.into()),
        }
    }
}

impl PartialEq for FilterKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Regex(a), Self::Regex(b)) => a.as_str() == b.as_str(),
            (Self::Set(a), Self::Set(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FilterKind {}

/// Parses one `FIELD=FILTER` token.
///
/// The token is split on the first `=` only, so values may contain `=`.
///
/// # Errors
///
/// - [`FilterError::Malformed`] when the token has no `=`
/// - [`FilterError::EmptyKey`] when nothing precedes the `=`
/// - [`FilterError::InvalidRegex`] when a `/.../` value does not compile
pub fn parse_filter(token: &str) -> Result<Filter, FilterError> {
    let Some((key, value)) = token.split_once('=') else {
        return Err(FilterError::malformed(token));
    };
    if key.is_empty() {
        return Err(FilterError::empty_key(token));
    }

    let kind = classify_value(token, value)?;
    debug!(key, ?kind, "parsed filter");
    Ok(Filter {
        key: key.to_string(),
        kind,
    })
}

/// Parses every token, stopping at the first bad one.
///
/// A later filter for the same key replaces the earlier one but keeps the
/// earlier position.
///
/// # Errors
///
/// Returns the first [`FilterError`] encountered.
pub fn parse_filters<S: AsRef<str>>(tokens: &[S]) -> Result<FilterMap, FilterError> {
    let mut filters = FilterMap::new();
    for token in tokens {
        let filter = parse_filter(token.as_ref())?;
        filters.insert(filter.key.clone(), filter);
    }
    Ok(filters)
}

fn classify_value(token: &str, value: &str) -> Result<FilterKind, FilterError> {
    if let Some(pattern) = strip_delimiters(value, '/', '/') {
        let regex = Regex::new(pattern).map_err(|e| FilterError::invalid_regex(token, &e))?;
        return Ok(FilterKind::Regex(regex));
    }

    if let Some(inner) = strip_delimiters(value, '[', ']') {
        let members = if inner.is_empty() {
            Vec::new()
        } else {
            inner.split(',').map(str::to_string).collect()
        };
        return Ok(FilterKind::Set(members));
    }

    Ok(FilterKind::Exact(value.to_string()))
}

/// Returns the text between `open` and `close` when `value` is at least two
/// characters long and wrapped in them.
fn strip_delimiters(value: &str, open: char, close: char) -> Option<&str> {
    if value.len() < 2 {
        return None;
    }
    value.strip_prefix(open)?.strip_suffix(close)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn exact_value(filter: &Filter) -> &str {
        match &filter.kind {
            FilterKind::Exact(value) => value,
            other => panic!("expected exact filter, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_filter_plain_value_is_exact() {
        for (token, expected) in [
            ("role=web", "web"),
            ("hostname=i-0abc.example.com", "i-0abc.example.com"),
            ("branch=", ""),
            ("env=prod/", "prod/"),
            ("env=/prod", "/prod"),
            ("tags=[a", "[a"),
            ("tags=a]", "a]"),
        ] {
            let filter = parse_filter(token).unwrap();
            assert_eq!(exact_value(&filter), expected, "token {token}");
        }
    }

    #[test]
    fn test_parse_filter_single_delimiter_falls_through_to_exact() {
        assert_eq!(exact_value(&parse_filter("path=/").unwrap()), "/");
        assert_eq!(exact_value(&parse_filter("tags=[").unwrap()), "[");
    }

    #[test]
    fn test_parse_filter_regex() {
        let filter = parse_filter("role=/^web/").unwrap();
        assert_eq!(filter.key, "role");
        match filter.kind {
            FilterKind::Regex(re) => assert_eq!(re.as_str(), "^web"),
            other => panic!("expected regex filter, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_filter_empty_regex_between_slashes() {
        let filter = parse_filter("role=//").unwrap();
        assert!(matches!(filter.kind, FilterKind::Regex(ref re) if re.as_str().is_empty()));
    }

    #[test]
    fn test_parse_filter_invalid_regex_is_error() {
        let err = parse_filter("role=/(unclosed/").unwrap_err();
        assert!(matches!(err, FilterError::InvalidRegex { .. }));
    }

    #[test]
    fn test_parse_filter_set() {
        let filter = parse_filter("tags=[a,b,c]").unwrap();
        assert_eq!(
            filter.kind,
            FilterKind::Set(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn test_parse_filter_empty_set() {
        let filter = parse_filter("tags=[]").unwrap();
        assert_eq!(filter.kind, FilterKind::Set(Vec::new()));
    }

    #[test]
    fn test_parse_filter_set_keeps_empty_members() {
        let filter = parse_filter("tags=[a,,b]").unwrap();
        assert_eq!(
            filter.kind,
            FilterKind::Set(vec!["a".into(), String::new(), "b".into()])
        );
    }

    #[test]
    fn test_parse_filter_splits_on_first_equals_only() {
        let filter = parse_filter("query=a=b=c").unwrap();
        assert_eq!(filter.key, "query");
        assert_eq!(exact_value(&filter), "a=b=c");
    }

    #[test]
    fn test_parse_filter_without_equals_is_malformed() {
        let err = parse_filter("novalue").unwrap_err();
        assert!(matches!(err, FilterError::Malformed { ref token, .. } if token == "novalue"));
    }

    #[test]
    fn test_parse_filter_empty_key_is_error() {
        let err = parse_filter("=web").unwrap_err();
        assert!(matches!(err, FilterError::EmptyKey { .. }));
    }

    #[test]
    fn test_parse_filters_last_write_wins_keeps_position() {
        let filters = parse_filters(&["role=web", "env=prod", "role=db"]).unwrap();
        let keys: Vec<&str> = filters.keys().map(String::as_str).collect();
        assert_eq!(keys, ["role", "env"]);
        assert_eq!(exact_value(&filters["role"]), "db");
    }

    #[test]
    fn test_parse_filters_fails_fast_on_first_bad_token() {
        let err = parse_filters(&["role=web", "first", "second"]).unwrap_err();
        assert!(matches!(err, FilterError::Malformed { ref token, .. } if token == "first"));
    }

    #[test]
    fn test_filters_compare_by_key_and_kind() {
        assert_eq!(parse_filter("role=web").unwrap(), Filter::exact("role", "web"));
        assert_eq!(parse_filter("role=/^w/").unwrap(), parse_filter("role=/^w/").unwrap());
        assert_ne!(parse_filter("role=web").unwrap(), Filter::exact("env", "web"));
        assert_ne!(parse_filter("role=/web/").unwrap(), Filter::exact("role", "web"));
    }

    #[test]
    fn test_parse_filters_empty_input() {
        let filters = parse_filters::<&str>(&[]).unwrap();
        assert!(filters.is_empty());
    }
}
