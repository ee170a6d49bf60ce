//! Error types for filter token parsing.

use thiserror::Error;

/// Errors that can occur while parsing a `KEY=VALUE` filter token.
#[derive(Debug, Clone, Error)]
pub enum FilterError {
    /// Token has no `=` separator.
    #[error("invalid filter '{token}': expected FIELD=FILTER\n  Suggestion: {suggestion}")]
    Malformed {
        /// The token as given on the command line.
        token: String,
        /// How to fix the issue.
        suggestion: &'static str,
    },

    /// Token has an `=` but nothing before it.
    #[error("invalid filter '{token}': field name is empty")]
    EmptyKey {
        /// The token as given on the command line.
        token: String,
    },

    /// Value looked like `/pattern/` but the pattern does not compile.
    #[error("invalid regex in filter '{token}': {reason}")]
    InvalidRegex {
        /// The token as given on the command line.
        token: String,
        /// Compiler message from the regex engine.
        reason: String,
    },
}

impl FilterError {
    /// Creates a `Malformed` error for a token without `=`.
    #[must_use]
    pub fn malformed(token: &str) -> Self {
        Self::Malformed {
            token: token.to_string(),
            suggestion: "Write filters as role=web, role=/^web/ or role=[web,db]",
        }
    }

    /// Creates an `EmptyKey` error.
    #[must_use]
    pub fn empty_key(token: &str) -> Self {
        Self::EmptyKey {
            token: token.to_string(),
        }
    }

    /// Creates an `InvalidRegex` error from a regex compile failure.
    #[must_use]
    pub fn invalid_regex(token: &str, error: &regex::Error) -> Self {
        Self::InvalidRegex {
            token: token.to_string(),
            reason: error.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_error_malformed_message() {
        let err = FilterError::malformed("novalue");
        let msg = err.to_string();
        assert!(msg.contains("novalue"), "should contain token: {msg}");
        assert!(msg.contains("FIELD=FILTER"), "should show syntax: {msg}");
        assert!(msg.contains("Suggestion:"), "should have suggestion: {msg}");
    }

    #[test]
    fn test_filter_error_empty_key_message() {
        let err = FilterError::empty_key("=web");
        assert!(err.to_string().contains("field name is empty"));
    }

    #[test]
    fn test_filter_error_invalid_regex_message() {
        let compile_error = regex::Regex::new("(").unwrap_err();
        let err = FilterError::invalid_regex("role=/(/", &compile_error);
        let msg = err.to_string();
        assert!(msg.contains("role=/(/"), "should contain token: {msg}");
        assert!(msg.starts_with("invalid regex"), "unexpected message: {msg}");
    }
}
