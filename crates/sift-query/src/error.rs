//! Errors raised while reading query text.
//!
//! The lexer and parser each report a small positioned error. Both are folded into
//! [`QueryError`], which carries the query text so it can point at the offending byte.

use std::{error::Error, fmt};

/// Tokenization failure at a byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    /// What went wrong.
    pub message: String,
    /// Byte offset of the failing construct.
    pub offset: usize,
}

impl LexError {
    /// Creates a lexer error at `offset`.
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (byte {})", self.message, self.offset)
    }
}

impl Error for LexError {}

/// Grammar failure at a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// What went wrong.
    pub message: String,
    /// Index of the failing token, `None` when the query ended early.
    pub token: Option<usize>,
}

impl ParseError {
    /// Creates a parse error at token `token`.
    pub fn new(message: impl Into<String>, token: Option<usize>) -> Self {
        Self {
            message: message.into(),
            token,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.token {
            Some(token) => write!(f, "{} (token {token})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl Error for ParseError {}

/// Broad class of a [`QueryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// The text is not well formed.
    Syntax,
    /// The text is well formed but cannot be registered.
    Invalid,
}

/// Hints keyed on a fragment of the error message.
const HINTS: &[(&str, &str)] = &[
    ("unclosed quote", "close the phrase with a matching \""),
    ("unclosed regular expression", "close the pattern with a matching /"),
    ("unclosed range", "close the range with ] or }"),
    ("closing parenthesis", "every ( needs a matching )"),
    ("operator", "AND and OR need an expression on both sides, e.g. 'rust OR golang'"),
    ("edit distance", "fuzzy edit distances range from 0 to 2, e.g. 'roam~1'"),
    ("empty query", "a query needs at least one term, phrase or pattern"),
];

/// A query that could not be read or registered.
#[derive(Debug, Clone)]
pub struct QueryError {
    /// Class of the failure.
    pub kind: QueryErrorKind,
    /// What went wrong.
    message: String,
    /// Byte offset into the query text, when known.
    pub offset: Option<usize>,
    /// The query text, when known.
    pub query: Option<String>,
}

impl QueryError {
    /// Creates a syntax error.
    pub fn syntax(message: impl Into<String>, offset: Option<usize>) -> Self {
        Self {
            kind: QueryErrorKind::Syntax,
            message: message.into(),
            offset,
            query: None,
        }
    }

    /// Creates an error for a well-formed query that cannot be used.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            kind: QueryErrorKind::Invalid,
            message: message.into(),
            offset: None,
            query: None,
        }
    }

    /// Attaches the query text.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Returns the bare message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns a fix-it hint for common mistakes.
    pub fn hint(&self) -> Option<&'static str> {
        HINTS
            .iter()
            .find(|(needle, _)| self.message.contains(needle))
            .map(|(_, hint)| *hint)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            QueryErrorKind::Syntax => "query syntax error",
            QueryErrorKind::Invalid => "invalid query",
        };
        write!(f, "{prefix}: {}", self.message)?;

        if let Some(query) = &self.query {
            write!(f, "\n  {query}")?;
            if let Some(offset) = self.offset {
                let column = query
                    .get(..offset.min(query.len()))
                    .map_or(0, |before| before.chars().count());
                write!(f, "\n  {}^", " ".repeat(column))?;
            }
        }

        if let Some(hint) = self.hint() {
            write!(f, "\nhint: {hint}")?;
        }
        Ok(())
    }
}

impl Error for QueryError {}

impl From<LexError> for QueryError {
    fn from(err: LexError) -> Self {
        Self::syntax(err.message, Some(err.offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caret_points_at_offset() {
        let err = QueryError::syntax("unexpected token", Some(4)).with_query("foo )");
        assert_eq!(err.to_string(), "query syntax error: unexpected token\n  foo )\n      ^");
    }

    #[test]
    fn caret_counts_characters() {
        let err = QueryError::syntax("unexpected token", Some(3)).with_query("é )");
        assert!(err.to_string().ends_with("\n    ^"));
    }

    #[test]
    fn offset_past_end_is_clamped() {
        let err = QueryError::syntax("unexpected end of query", Some(99)).with_query("ab");
        assert!(err.to_string().ends_with("\n    ^"));
    }

    #[test]
    fn lex_errors_keep_their_offset() {
        let err = QueryError::from(LexError::new("unclosed quote", 2)).with_query("a \"b");
        assert_eq!(err.kind, QueryErrorKind::Syntax);
        assert_eq!(err.offset, Some(2));
        assert!(err.to_string().contains("hint: close the phrase"));
    }

    #[test]
    fn invalid_errors_have_no_caret() {
        let err = QueryError::invalid("empty query").with_query("");
        let display = err.to_string();
        assert!(display.starts_with("invalid query: empty query"));
        assert!(!display.contains('^'));
        assert!(display.contains("hint:"));
    }

    #[test]
    fn unknown_messages_have_no_hint() {
        assert_eq!(QueryError::syntax("something odd", None).hint(), None);
    }
}
