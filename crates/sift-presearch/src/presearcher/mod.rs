//! Presearchers.
//!
//! A presearcher decides what to index for each registered query and how to select
//! candidate queries for an incoming document. The selection query built for a document
//! always admits queries indexed under the any token, so a query that could not be
//! filtered is never missed.

mod field_filter;
mod multipass;
mod term;

use std::collections::{BTreeMap, BTreeSet};

pub use field_filter::{FILTER_FIELD_PREFIX, FieldFilterPresearcher, MetadataTokenizer};
pub use multipass::{DEFAULT_PASSES, MultipassPresearcher};
pub use term::TermPresearcher;

use sift_query::QueryExpr;

use crate::{
    builder::TreeBuilder,
    selection::{FieldTerms, SelectionQuery},
    term::{ANY_TOKEN, ANY_TOKEN_FIELD, QueryTerm},
    tree::QueryTree,
    wildcard::WildcardNGrams,
};

/// Query metadata supplied at registration time.
pub type Metadata = BTreeMap<String, String>;

/// Decides which document terms may take part in a selection query.
pub trait TermFilter {
    /// Returns true if the term can select any indexed query.
    fn accepts(&self, field: &str, term: &str) -> bool;
}

/// Accepts every term.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl TermFilter for AcceptAll {
    fn accepts(&self, _field: &str, _term: &str) -> bool {
        true
    }
}

impl TermFilter for FieldTerms {
    fn accepts(&self, field: &str, term: &str) -> bool {
        self.contains(field, term)
    }
}

/// Presearch indexing and candidate selection.
pub trait Presearcher: Send + Sync {
    /// Returns the tree builder used for extraction.
    fn builder(&self) -> &TreeBuilder;

    /// Builds the query tree for an expression.
    fn build_tree(&self, expr: &QueryExpr) -> QueryTree {
        self.builder().build(expr)
    }

    /// Returns the terms to index for a query.
    fn index_query(&self, tree: &QueryTree, metadata: &Metadata) -> FieldTerms;

    /// Builds the selection query for a document's terms.
    ///
    /// Terms rejected by `filter` are left out.
    fn build_query(&self, document: &FieldTerms, filter: &dyn TermFilter) -> SelectionQuery;
}

/// Matches queries indexed under the any token.
pub fn any_token_query() -> SelectionQuery {
    SelectionQuery::term(ANY_TOKEN_FIELD, ANY_TOKEN)
}

/// Adds extracted terms to a query document, naming fields with `field_name`.
///
/// `Any` terms are always indexed under the unsuffixed any-token field.
fn index_terms(
    terms: &BTreeSet<QueryTerm>,
    ngrams: Option<&WildcardNGrams>,
    field_name: impl Fn(&str) -> String,
    out: &mut FieldTerms,
) {
    for term in terms {
        if term.is_any() {
            out.add(ANY_TOKEN_FIELD, ANY_TOKEN);
            continue;
        }
        let field = field_name(&term.field);
        if let Some(extra) = ngrams.and_then(|n| n.extra_token(term)) {
            out.add(field.clone(), extra);
        }
        out.add(field, term.text.clone());
    }
}

/// Expands (with n-grams) and filters a document's terms, dropping empty fields.
fn document_terms(
    document: &FieldTerms,
    ngrams: Option<&WildcardNGrams>,
    filter: &dyn TermFilter,
) -> Vec<(String, BTreeSet<String>)> {
    let mut out = Vec::new();
    for (field, tokens) in document.fields() {
        let expanded = match ngrams {
            Some(ngrams) => {
                let mut expanded = BTreeSet::new();
                for token in tokens {
                    ngrams.expand_token(token, &mut expanded);
                }
                expanded
            }
            None => tokens.clone(),
        };
        let accepted: BTreeSet<String> = expanded
            .into_iter()
            .filter(|t| filter.accepts(field, t))
            .collect();
        if !accepted.is_empty() {
            out.push((field.to_string(), accepted));
        }
    }
    out
}
