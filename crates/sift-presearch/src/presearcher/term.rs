//! Single-pass presearcher.

use crate::{
    builder::TreeBuilder,
    selection::{FieldTerms, SelectionQuery},
    tree::QueryTree,
};

use super::{Metadata, Presearcher, TermFilter, any_token_query, document_terms, index_terms};

/// Indexes each query once, under its own field names.
#[derive(Debug, Clone, Default)]
pub struct TermPresearcher {
    /// Tree builder.
    builder: TreeBuilder,
}

impl TermPresearcher {
    /// Creates a presearcher using the given builder.
    pub fn new(builder: TreeBuilder) -> Self {
        Self { builder }
    }
}

impl Presearcher for TermPresearcher {
    fn builder(&self) -> &TreeBuilder {
        &self.builder
    }

    fn index_query(&self, tree: &QueryTree, _metadata: &Metadata) -> FieldTerms {
        let mut out = FieldTerms::new();
        index_terms(&tree.terms(), self.builder.ngrams(), str::to_string, &mut out);
        out
    }

    fn build_query(&self, document: &FieldTerms, filter: &dyn TermFilter) -> SelectionQuery {
        let mut clauses: Vec<SelectionQuery> = document_terms(document, self.builder.ngrams(), filter)
            .into_iter()
            .map(|(field, terms)| SelectionQuery::Terms { field, terms })
            .collect();
        clauses.push(any_token_query());
        SelectionQuery::Or(clauses)
    }
}

#[cfg(test)]
mod tests {
    use sift_query::{ParseOptions, parse};

    use super::*;
    use crate::{presearcher::AcceptAll, wildcard::WildcardNGrams};

    fn index(presearcher: &TermPresearcher, query: &str) -> FieldTerms {
        let expr = parse(query, &ParseOptions::new("f")).unwrap().unwrap();
        let tree = presearcher.build_tree(&expr);
        presearcher.index_query(&tree, &Metadata::new())
    }

    fn document(text: &str) -> FieldTerms {
        text.split_whitespace().map(|t| ("f", t)).collect()
    }

    fn selects(query: &str, text: &str) -> bool {
        let presearcher = TermPresearcher::default();
        let indexed = index(&presearcher, query);
        presearcher
            .build_query(&document(text), &AcceptAll)
            .matches(&indexed)
    }

    #[test]
    fn registered_corpus_scenario() {
        let doc = "some text about the world";
        assert!(!selects("cheese", doc));
        assert!(!selects("sesquipedalian", doc));
        assert!(selects("text", doc));
        // "goodbye" outweighs "world", so only documents containing it select the query
        assert!(!selects("+goodbye +world", doc));
        assert!(selects("+goodbye +world", "goodbye"));
    }

    #[test]
    fn disjunction_selected_by_either_term() {
        assert!(selects("term1 term2", "term1"));
        assert!(selects("term1 term2", "term2"));
        assert!(!selects("term1 term2", "term3"));
    }

    #[test]
    fn conjunction_needs_selected_term() {
        assert!(selects("+term1 +term22", "term22"));
        assert!(!selects("+term1 +term22", "term1"));
    }

    #[test]
    fn unfilterable_queries_always_selected() {
        assert!(selects("f:[a TO b]", "nothing"));
        assert!(selects("-foo", "foo"));
    }

    #[test]
    fn empty_document_selects_only_any_queries() {
        assert!(!selects("hello", ""));
        assert!(selects("*:*", ""));
    }

    #[test]
    fn wildcard_queries_with_ngrams() {
        let builder = TreeBuilder::default().with_ngrams(WildcardNGrams::default());
        let presearcher = TermPresearcher::new(builder);
        let indexed = index(&presearcher, "hel*");

        assert!(presearcher.build_query(&document("well hello"), &AcceptAll).matches(&indexed));
        assert!(!presearcher.build_query(&document("goodbye"), &AcceptAll).matches(&indexed));
    }
}
