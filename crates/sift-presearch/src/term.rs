//! Extracted query terms.

use std::fmt;

/// Field under which queries that cannot be filtered are indexed.
pub const ANY_TOKEN_FIELD: &str = "__anytokenfield";

/// Token indexed in [`ANY_TOKEN_FIELD`] for queries that cannot be filtered.
pub const ANY_TOKEN: &str = "__ANYTOKEN__";

/// The kind of an extracted term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TermKind {
    /// A literal term that must appear in the field.
    Exact,
    /// No safe filter term exists; the query must always be a candidate.
    Any,
    /// A derived term produced by an extension, such as a wildcard n-gram.
    Custom,
}

/// An atomic unit extracted from a query for presearch indexing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryTerm {
    /// Field the term belongs to.
    pub field: String,
    /// Term text.
    pub text: String,
    /// Term kind.
    pub kind: TermKind,
    /// Auxiliary payload. For `Any` terms this is the reason no filter could be
    /// extracted; for `Custom` terms it is an extra token indexed alongside the term.
    pub payload: Option<String>,
}

impl QueryTerm {
    /// Creates an exact term.
    pub fn exact(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            text: text.into(),
            kind: TermKind::Exact,
            payload: None,
        }
    }

    /// Creates an `Any` sentinel term carrying the reason extraction gave up.
    pub fn any(reason: impl Into<String>) -> Self {
        Self {
            field: ANY_TOKEN_FIELD.to_string(),
            text: ANY_TOKEN.to_string(),
            kind: TermKind::Any,
            payload: Some(reason.into()),
        }
    }

    /// Creates a custom term with an auxiliary payload token.
    pub fn custom(
        field: impl Into<String>,
        text: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            text: text.into(),
            kind: TermKind::Custom,
            payload: Some(payload.into()),
        }
    }

    /// Returns true for the `Any` sentinel.
    pub fn is_any(&self) -> bool {
        self.kind == TermKind::Any
    }
}

impl fmt::Display for QueryTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TermKind::Exact => write!(f, "{}:{}", self.field, self.text),
            TermKind::Any => write!(f, "ANY({})", self.payload.as_deref().unwrap_or("")),
            TermKind::Custom => write!(
                f,
                "{}:{} [{}]",
                self.field,
                self.text,
                self.payload.as_deref().unwrap_or("")
            ),
        }
    }
}
