//! Candidate matchers.
//!
//! A [`CandidateMatcher`] evaluates candidate queries selected by the presearcher against
//! one document and reports a match value per query. Matchers are created per document
//! (and per worker) by a [`MatcherFactory`]. When a query is evaluated more than once,
//! for instance once per disjunct, [`CandidateMatcher::resolve`] merges the results.

mod explain;
mod highlight;
mod scoring;
mod simple;

use std::{fmt::Debug, sync::Arc};

pub use explain::{ExplainingMatcher, ExplanationMatch};
pub use highlight::{Hit, HighlightingMatcher, HighlightsMatch};
pub use scoring::{ScoringMatch, ScoringMatcher};
pub use simple::{QueryMatch, SimpleMatcher};
use sift_query::QueryExpr;
use thiserror::Error;

use crate::{compile::CompileError, document::DocumentIndex};

/// Failure evaluating one candidate query.
#[derive(Debug, Error)]
pub enum MatcherError {
    /// The query could not be compiled against the document.
    #[error("{0}")]
    Compile(#[from] CompileError),

    /// The compiled query failed to execute.
    #[error("search failed: {0}")]
    Search(String),
}

impl From<tantivy::TantivyError> for MatcherError {
    fn from(err: tantivy::TantivyError) -> Self {
        Self::Search(err.to_string())
    }
}

/// Evaluates candidate queries against a document.
pub trait CandidateMatcher: Send {
    /// Per-query match value.
    type Match: Clone + Send + Debug;

    /// Evaluates one candidate. Returns `None` if the query does not match.
    ///
    /// `highlight`, when given, is used in place of `query` to report match positions.
    fn match_query(
        &mut self,
        query_id: &str,
        query: &QueryExpr,
        highlight: Option<&QueryExpr>,
    ) -> Result<Option<Self::Match>, MatcherError>;

    /// Merges two matches reported for the same query.
    fn resolve(&self, a: Self::Match, b: Self::Match) -> Self::Match;
}

/// Creates matchers for a document.
///
/// Implemented by any `Fn(&Arc<DocumentIndex>) -> M`, so matcher constructors such as
/// [`SimpleMatcher::new`] can be passed directly.
pub trait MatcherFactory: Sync {
    /// Matcher type created.
    type Matcher: CandidateMatcher;

    /// Creates a matcher for the document.
    fn create(&self, document: &Arc<DocumentIndex>) -> Self::Matcher;
}

impl<F, M> MatcherFactory for F
where
    F: Fn(&Arc<DocumentIndex>) -> M + Sync,
    M: CandidateMatcher,
{
    type Matcher = M;

    fn create(&self, document: &Arc<DocumentIndex>) -> M {
        self(document)
    }
}

/// Match value type produced by a factory.
pub type MatchOf<F> = <<F as MatcherFactory>::Matcher as CandidateMatcher>::Match;
