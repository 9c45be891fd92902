//! Query tree construction.
//!
//! [`TreeBuilder::build`] maps every [`QueryExpr`] shape to a [`QueryTree`]. It never fails:
//! shapes that cannot be filtered become any-nodes, so a query is always a candidate rather
//! than silently missed.

use sift_query::{Clause, Occur, QueryExpr};
use tracing::debug;

use crate::{
    term::QueryTerm,
    tree::QueryTree,
    weight::TreeWeightor,
    wildcard::{WildcardNGrams, regex_literal, wildcard_literal},
};

/// Builds weighted query trees from query expressions.
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    /// Weightor used for every node.
    weightor: TreeWeightor,
    /// N-gram settings for wildcard-like expressions; `None` makes them any-nodes.
    ngrams: Option<WildcardNGrams>,
}

impl TreeBuilder {
    /// Creates a builder using the given weightor.
    pub fn new(weightor: TreeWeightor) -> Self {
        Self {
            weightor,
            ngrams: None,
        }
    }

    /// Enables n-gram extraction for wildcard, prefix and regex expressions.
    pub fn with_ngrams(mut self, ngrams: WildcardNGrams) -> Self {
        self.ngrams = Some(ngrams);
        self
    }

    /// Returns the weightor.
    pub fn weightor(&self) -> &TreeWeightor {
        &self.weightor
    }

    /// Returns the n-gram settings, if enabled.
    pub fn ngrams(&self) -> Option<&WildcardNGrams> {
        self.ngrams.as_ref()
    }

    /// Builds the query tree for an expression.
    pub fn build(&self, expr: &QueryExpr) -> QueryTree {
        let w = &self.weightor;
        match expr {
            QueryExpr::Term { field, text } => {
                if text.is_empty() {
                    return self.any("EMPTY TERM");
                }
                QueryTree::term(QueryTerm::exact(field, text), w)
            }

            QueryExpr::Phrase { field, terms, .. } => {
                let children = terms
                    .iter()
                    .filter(|t| !t.is_empty())
                    .map(|t| QueryTree::term(QueryTerm::exact(field, t), w))
                    .collect();
                QueryTree::conjunction(children, w)
            }

            QueryExpr::Boolean {
                clauses,
                minimum_should_match,
            } => self.build_boolean(clauses, *minimum_should_match),

            QueryExpr::Boost { expr, .. } | QueryExpr::ConstantScore(expr) => self.build(expr),

            QueryExpr::Prefix { field, prefix } => self.build_ngram(field, Some(prefix.clone())),

            QueryExpr::Wildcard { field, pattern } => {
                self.build_ngram(field, Some(wildcard_literal(pattern)))
            }

            QueryExpr::Regex { field, pattern } => self.build_ngram(field, regex_literal(pattern)),

            QueryExpr::Fuzzy { .. } => self.any("FUZZY"),
            QueryExpr::Range { .. } => self.any("RANGE"),
            QueryExpr::MatchAll => self.any("MATCH ALL"),
        }
    }

    /// Builds a boolean expression.
    ///
    /// Required clauses form a conjunction (with the optional clauses as one extra
    /// conjunct when at least one of them must match). Without required clauses the
    /// optional clauses form a disjunction. Prohibited clauses never contribute terms.
    fn build_boolean(&self, clauses: &[Clause], minimum_should_match: usize) -> QueryTree {
        let w = &self.weightor;
        let musts: Vec<&QueryExpr> = clauses
            .iter()
            .filter(|c| c.occur == Occur::Must)
            .map(|c| &c.expr)
            .collect();
        let shoulds: Vec<&QueryExpr> = clauses
            .iter()
            .filter(|c| c.occur == Occur::Should)
            .map(|c| &c.expr)
            .collect();

        if musts.is_empty() && shoulds.is_empty() {
            return self.any("PURE NEGATIVE BOOLEAN");
        }

        if musts.is_empty() {
            let children = shoulds.into_iter().map(|e| self.build(e)).collect();
            return QueryTree::disjunction(children, w);
        }

        let mut children: Vec<QueryTree> = musts.into_iter().map(|e| self.build(e)).collect();
        if minimum_should_match > 0 && !shoulds.is_empty() {
            let optional = shoulds.into_iter().map(|e| self.build(e)).collect();
            children.push(QueryTree::disjunction(optional, w));
        }
        QueryTree::conjunction(children, w)
    }

    /// Builds a wildcard-like expression from its literal run.
    fn build_ngram(&self, field: &str, literal: Option<String>) -> QueryTree {
        match (&self.ngrams, literal) {
            (Some(ngrams), Some(literal)) => {
                QueryTree::term(ngrams.query_term(field, &literal), &self.weightor)
            }
            (Some(_), None) => self.any("REGEX WITHOUT LITERAL"),
            (None, _) => self.any("WILDCARD"),
        }
    }

    /// Creates an any-node, logging the degeneration.
    fn any(&self, reason: &str) -> QueryTree {
        debug!(reason, "query shape cannot be filtered");
        QueryTree::any(reason, &self.weightor)
    }
}
