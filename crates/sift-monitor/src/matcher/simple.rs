//! Boolean matching.

use std::sync::Arc;

use serde::Serialize;
use sift_query::QueryExpr;
use tantivy::collector::Count;

use super::{CandidateMatcher, MatcherError};
use crate::{compile::QueryCompiler, document::DocumentIndex};

/// A matching query, without further detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryMatch {
    /// Id of the matching query.
    pub query_id: String,
}

/// Reports which queries match.
pub struct SimpleMatcher {
    /// Compiler bound to the document.
    compiler: QueryCompiler,
}

impl SimpleMatcher {
    /// Creates a matcher for a document.
    pub fn new(document: &Arc<DocumentIndex>) -> Self {
        Self {
            compiler: QueryCompiler::new(Arc::clone(document)),
        }
    }
}

impl CandidateMatcher for SimpleMatcher {
    type Match = QueryMatch;

    fn match_query(
        &mut self,
        query_id: &str,
        query: &QueryExpr,
        _highlight: Option<&QueryExpr>,
    ) -> Result<Option<QueryMatch>, MatcherError> {
        let compiled = self.compiler.compile(query)?;
        let count = self
            .compiler
            .document()
            .searcher()
            .search(compiled.as_ref(), &Count)?;
        Ok((count > 0).then(|| QueryMatch {
            query_id: query_id.to_string(),
        }))
    }

    fn resolve(&self, a: QueryMatch, _b: QueryMatch) -> QueryMatch {
        a
    }
}
