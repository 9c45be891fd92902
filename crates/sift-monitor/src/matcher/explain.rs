//! Matching with score explanations.

use std::sync::Arc;

use serde::Serialize;
use sift_query::QueryExpr;
use tantivy::collector::TopDocs;

use super::{CandidateMatcher, MatcherError};
use crate::{compile::QueryCompiler, document::DocumentIndex};

/// A matching query with the explanation of its score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplanationMatch {
    /// Id of the matching query.
    pub query_id: String,
    /// Score of the document for the query.
    pub score: f32,
    /// Tantivy's score explanation, as pretty-printed JSON.
    pub explanation: String,
}

/// Reports matching queries with score explanations.
pub struct ExplainingMatcher {
    /// Compiler bound to the document.
    compiler: QueryCompiler,
}

impl ExplainingMatcher {
    /// Creates a matcher for a document.
    pub fn new(document: &Arc<DocumentIndex>) -> Self {
        Self {
            compiler: QueryCompiler::new(Arc::clone(document)),
        }
    }
}

impl CandidateMatcher for ExplainingMatcher {
    type Match = ExplanationMatch;

    fn match_query(
        &mut self,
        query_id: &str,
        query: &QueryExpr,
        _highlight: Option<&QueryExpr>,
    ) -> Result<Option<ExplanationMatch>, MatcherError> {
        let compiled = self.compiler.compile(query)?;
        let document = self.compiler.document();
        let searcher = document.searcher();
        if searcher
            .search(compiled.as_ref(), &TopDocs::with_limit(1))?
            .is_empty()
        {
            return Ok(None);
        }

        let explanation = compiled.explain(searcher, document.address())?;
        Ok(Some(ExplanationMatch {
            query_id: query_id.to_string(),
            score: explanation.value(),
            explanation: explanation.to_pretty_json(),
        }))
    }

    fn resolve(&self, a: ExplanationMatch, b: ExplanationMatch) -> ExplanationMatch {
        if b.score > a.score { b } else { a }
    }
}
