//! Query decomposition.
//!
//! A query whose top level is a disjunction is split into its disjuncts. Each part is
//! indexed as its own presearch document, so a document only runs the disjuncts its terms
//! can select instead of the whole query.

use sift_query::{Clause, Occur, QueryExpr};

/// Splits disjunctive queries into independently indexable parts.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryDecomposer;

impl QueryDecomposer {
    /// Returns the parts of a query. Queries that cannot be split yield themselves.
    pub fn decompose(&self, expr: &QueryExpr) -> Vec<QueryExpr> {
        match expr {
            QueryExpr::Boolean {
                clauses,
                minimum_should_match,
            } => self.decompose_boolean(expr, clauses, *minimum_should_match),
            QueryExpr::Boost { expr: inner, factor } => {
                let parts = self.decompose(inner);
                if *factor == 1.0 {
                    return parts;
                }
                parts
                    .into_iter()
                    .map(|part| QueryExpr::boost(part, *factor))
                    .collect()
            }
            _ => vec![expr.clone()],
        }
    }

    /// Splits a boolean expression on its optional clauses.
    fn decompose_boolean(
        &self,
        expr: &QueryExpr,
        clauses: &[Clause],
        minimum_should_match: usize,
    ) -> Vec<QueryExpr> {
        if minimum_should_match > 1 {
            return vec![expr.clone()];
        }

        let mut parts = Vec::new();
        let mut exclusions = Vec::new();
        let mut mandatory = Vec::new();

        for clause in clauses {
            match clause.occur {
                Occur::Must => mandatory.push(&clause.expr),
                Occur::MustNot => exclusions.push(&clause.expr),
                Occur::Should => parts.extend(self.decompose(&clause.expr)),
            }
        }

        if mandatory.len() > 1 || (mandatory.len() == 1 && !parts.is_empty()) {
            return vec![expr.clone()];
        }
        if let Some(only) = mandatory.first() {
            parts.extend(self.decompose(only));
        }
        // Purely negative booleans match by exclusion and have nothing to split.
        if parts.is_empty() {
            return vec![expr.clone()];
        }

        if exclusions.is_empty() {
            return parts;
        }

        parts
            .into_iter()
            .map(|part| {
                let mut rewritten = vec![Clause::must(part)];
                rewritten.extend(exclusions.iter().map(|ex| Clause::must_not((*ex).clone())));
                QueryExpr::boolean(rewritten)
            })
            .collect()
    }
}
