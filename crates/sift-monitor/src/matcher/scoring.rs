//! Scored matching.

use std::sync::Arc;

use serde::Serialize;
use sift_query::QueryExpr;
use tantivy::collector::TopDocs;

use super::{CandidateMatcher, MatcherError};
use crate::{compile::QueryCompiler, document::DocumentIndex};

/// A matching query with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringMatch {
    /// Id of the matching query.
    pub query_id: String,
    /// BM25 score of the document for the query.
    pub score: f32,
}

/// Reports matching queries with scores. Repeated matches keep the highest score.
pub struct ScoringMatcher {
    /// Compiler bound to the document.
    compiler: QueryCompiler,
}

impl ScoringMatcher {
    /// Creates a matcher for a document.
    pub fn new(document: &Arc<DocumentIndex>) -> Self {
        Self {
            compiler: QueryCompiler::new(Arc::clone(document)),
        }
    }
}

impl CandidateMatcher for ScoringMatcher {
    type Match = ScoringMatch;

    fn match_query(
        &mut self,
        query_id: &str,
        query: &QueryExpr,
        _highlight: Option<&QueryExpr>,
    ) -> Result<Option<ScoringMatch>, MatcherError> {
        let compiled = self.compiler.compile(query)?;
        let top = self
            .compiler
            .document()
            .searcher()
            .search(compiled.as_ref(), &TopDocs::with_limit(1))?;
        Ok(top.first().map(|(score, _)| ScoringMatch {
            query_id: query_id.to_string(),
            score: *score,
        }))
    }

    fn resolve(&self, a: ScoringMatch, b: ScoringMatch) -> ScoringMatch {
        if b.score > a.score { b } else { a }
    }
}
