//! Highlighting matcher.
//!
//! Reports where in each field a matching query hit. Hits are the document tokens whose
//! analyzed text is one of the query's positive terms, with multi-term expressions
//! expanded against the document. A query registered with a separate highlight query
//! reports the highlight query's hits.

use std::{
    collections::{BTreeMap, BTreeSet},
    ops::Range,
    sync::Arc,
};

use serde::Serialize;
use sift_query::QueryExpr;
use tantivy::collector::Count;

use super::{CandidateMatcher, MatcherError};
use crate::{compile::QueryCompiler, document::DocumentIndex};

/// A single token hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Hit {
    /// Token position of the first hit token.
    pub start_position: usize,
    /// Byte offset where the hit starts.
    pub start_offset: usize,
    /// Token position of the last hit token.
    pub end_position: usize,
    /// Byte offset where the hit ends.
    pub end_offset: usize,
}

/// A matching query with its hits by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightsMatch {
    /// Id of the matching query.
    pub query_id: String,
    /// Field name to hits, ordered by position.
    pub hits: BTreeMap<String, BTreeSet<Hit>>,
}

impl HighlightsMatch {
    /// Total number of hits across fields.
    pub fn hit_count(&self) -> usize {
        self.hits.values().map(BTreeSet::len).sum()
    }

    /// Returns the hits of a field.
    pub fn field_hits(&self, field: &str) -> impl Iterator<Item = &Hit> {
        self.hits.get(field).into_iter().flatten()
    }

    /// Returns the byte ranges hit in a field, with overlapping and adjacent hits merged.
    pub fn ranges(&self, field: &str) -> Vec<Range<usize>> {
        let mut spans: Vec<Range<usize>> = self
            .field_hits(field)
            .map(|h| h.start_offset..h.end_offset)
            .collect();
        spans.sort_by_key(|r| r.start);

        let mut merged: Vec<Range<usize>> = Vec::with_capacity(spans.len());
        for span in spans {
            match merged.last_mut() {
                Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
                _ => merged.push(span),
            }
        }
        merged
    }
}

/// Reports matching queries with token hits.
pub struct HighlightingMatcher {
    /// Compiler bound to the document.
    compiler: QueryCompiler,
}

impl HighlightingMatcher {
    /// Creates a matcher for a document.
    pub fn new(document: &Arc<DocumentIndex>) -> Self {
        Self {
            compiler: QueryCompiler::new(Arc::clone(document)),
        }
    }

    /// Collects the hits of an expression.
    fn hits(&mut self, expr: &QueryExpr) -> Result<BTreeMap<String, BTreeSet<Hit>>, MatcherError> {
        let terms = self.compiler.positive_terms(expr)?;
        let document = self.compiler.document();

        let mut hits = BTreeMap::new();
        for (field, field_terms) in terms.fields() {
            let field_hits: BTreeSet<Hit> = document
                .tokens(field)
                .iter()
                .filter(|token| field_terms.contains(&token.text))
                .map(|token| Hit {
                    start_position: token.position,
                    start_offset: token.offset_from,
                    end_position: token.position,
                    end_offset: token.offset_to,
                })
                .collect();
            if !field_hits.is_empty() {
                hits.insert(field.to_string(), field_hits);
            }
        }
        Ok(hits)
    }
}

impl CandidateMatcher for HighlightingMatcher {
    type Match = HighlightsMatch;

    fn match_query(
        &mut self,
        query_id: &str,
        query: &QueryExpr,
        highlight: Option<&QueryExpr>,
    ) -> Result<Option<HighlightsMatch>, MatcherError> {
        let compiled = self.compiler.compile(query)?;
        let count = self
            .compiler
            .document()
            .searcher()
            .search(compiled.as_ref(), &Count)?;
        if count == 0 {
            return Ok(None);
        }

        let hits = self.hits(highlight.unwrap_or(query))?;
        Ok(Some(HighlightsMatch {
            query_id: query_id.to_string(),
            hits,
        }))
    }

    fn resolve(&self, mut a: HighlightsMatch, b: HighlightsMatch) -> HighlightsMatch {
        for (field, hits) in b.hits {
            a.hits.entry(field).or_default().extend(hits);
        }
        a
    }
}

#[cfg(test)]
mod test {
    use sift_query::{ParseOptions, parse};

    use super::*;
    use crate::{
        analyzer::{analyze_query, build_analyzer},
        document::InputDocument,
    };

    fn matcher(text: &str) -> HighlightingMatcher {
        let doc = InputDocument::new("d").with_field("text", text);
        let index = DocumentIndex::build(&doc, &build_analyzer(None)).unwrap();
        HighlightingMatcher::new(&Arc::new(index))
    }

    fn expr(query: &str) -> QueryExpr {
        let parsed = parse(query, &ParseOptions::new("text")).unwrap().unwrap();
        analyze_query(&parsed, &build_analyzer(None))
    }

    #[test]
    fn reports_token_offsets() {
        let mut m = matcher("hello big world");
        let found = m.match_query("q", &expr("world"), None).unwrap().unwrap();
        let hits: Vec<_> = found.field_hits("text").copied().collect();
        assert_eq!(
            hits,
            vec![Hit {
                start_position: 2,
                start_offset: 10,
                end_position: 2,
                end_offset: 15,
            }]
        );
    }

    #[test]
    fn no_hits_without_match() {
        let mut m = matcher("hello world");
        assert!(m.match_query("q", &expr("+hello +cheese"), None).unwrap().is_none());
    }

    #[test]
    fn highlight_query_overrides_hits() {
        let mut m = matcher("hello big world");
        let found = m
            .match_query("q", &expr("hello"), Some(&expr("big")))
            .unwrap()
            .unwrap();
        assert_eq!(found.ranges("text"), vec![6..9]);
    }

    #[test]
    fn wildcard_hits_expand() {
        let mut m = matcher("wonder wonderful world");
        let found = m.match_query("q", &expr("wonder*"), None).unwrap().unwrap();
        assert_eq!(found.hit_count(), 2);
        assert_eq!(found.ranges("text"), vec![0..6, 7..16]);
    }

    #[test]
    fn resolve_unions_hits() {
        let mut m = matcher("alpha beta");
        let a = m.match_query("q", &expr("alpha"), None).unwrap().unwrap();
        let b = m.match_query("q", &expr("beta"), None).unwrap().unwrap();
        let merged = m.resolve(a, b);
        assert_eq!(merged.hit_count(), 2);
        assert_eq!(merged.ranges("text"), vec![0..5, 6..10]);
    }
}
