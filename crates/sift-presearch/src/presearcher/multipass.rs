//! Multi-pass presearcher.
//!
//! Each query is indexed once per pass under pass-suffixed field names, advancing the
//! query tree between passes so every pass records a different sufficient term set. A
//! document must satisfy the selection in every pass, which tightens precision without
//! losing recall: each pass on its own never excludes a true match.

use std::collections::BTreeSet;

use crate::{
    builder::TreeBuilder,
    selection::{FieldTerms, SelectionQuery},
    term::QueryTerm,
    tree::{QueryTree, TreeAdvancer},
};

use super::{Metadata, Presearcher, TermFilter, any_token_query, document_terms, index_terms};

/// Default number of passes.
pub const DEFAULT_PASSES: usize = 2;

/// Indexes each query under several pass fields.
#[derive(Debug, Clone)]
pub struct MultipassPresearcher {
    /// Tree builder.
    builder: TreeBuilder,
    /// Number of passes.
    passes: usize,
    /// Decides which subtrees may be skipped between passes.
    advancer: TreeAdvancer,
}

impl Default for MultipassPresearcher {
    fn default() -> Self {
        Self::new(TreeBuilder::default(), DEFAULT_PASSES, TreeAdvancer::default())
    }
}

impl MultipassPresearcher {
    /// Creates a presearcher. A pass count of zero is treated as one.
    pub fn new(builder: TreeBuilder, passes: usize, advancer: TreeAdvancer) -> Self {
        Self {
            builder,
            passes: passes.max(1),
            advancer,
        }
    }

    /// Returns the number of passes.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Returns the field name used for a field in a pass.
    pub fn pass_field(field: &str, pass: usize) -> String {
        format!("{field}_{pass}")
    }

    /// Returns the term set recorded in each pass.
    ///
    /// Once the tree stops changing, the remaining passes repeat the last term set.
    pub fn pass_terms(&self, tree: &QueryTree) -> Vec<BTreeSet<QueryTerm>> {
        let weightor = self.builder.weightor();
        let mut out = Vec::with_capacity(self.passes);
        let mut current = tree.clone();

        for pass in 0..self.passes {
            out.push(current.terms());
            if pass + 1 == self.passes {
                break;
            }
            match current.advance_phase(weightor, &self.advancer) {
                Some(next) => current = next,
                None => break,
            }
        }

        if let Some(last) = out.last().cloned() {
            out.resize(self.passes, last);
        }
        out
    }
}

impl Presearcher for MultipassPresearcher {
    fn builder(&self) -> &TreeBuilder {
        &self.builder
    }

    fn index_query(&self, tree: &QueryTree, _metadata: &Metadata) -> FieldTerms {
        let ngrams = self.builder.ngrams();
        let mut out = FieldTerms::new();
        for (pass, terms) in self.pass_terms(tree).iter().enumerate() {
            index_terms(terms, ngrams, |f| Self::pass_field(f, pass), &mut out);
            // unsuffixed copy feeds the document term filter
            index_terms(terms, ngrams, str::to_string, &mut out);
        }
        out
    }

    fn build_query(&self, document: &FieldTerms, filter: &dyn TermFilter) -> SelectionQuery {
        let terms = document_terms(document, self.builder.ngrams(), filter);
        let passes = (0..self.passes)
            .map(|pass| {
                SelectionQuery::Or(
                    terms
                        .iter()
                        .map(|(field, terms)| SelectionQuery::Terms {
                            field: Self::pass_field(field, pass),
                            terms: terms.clone(),
                        })
                        .collect(),
                )
            })
            .collect();
        SelectionQuery::Or(vec![SelectionQuery::And(passes), any_token_query()])
    }
}
