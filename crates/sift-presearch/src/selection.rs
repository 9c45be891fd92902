//! Presearch documents and selection queries.
//!
//! Both sides of the presearch index are described by [`FieldTerms`]: a registered query
//! is indexed as the terms its presearcher extracted, and an incoming document is
//! presented as the tokens of each of its fields. A [`SelectionQuery`] built from the
//! document's terms is evaluated against the indexed query documents; the index engine
//! compiles it into its own query type, and [`SelectionQuery::matches`] evaluates it in
//! memory.

use std::collections::{BTreeMap, BTreeSet};

/// Terms grouped by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTerms {
    /// Field name to terms.
    fields: BTreeMap<String, BTreeSet<String>>,
}

impl FieldTerms {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a term to a field.
    pub fn add(&mut self, field: impl Into<String>, term: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .insert(term.into());
    }

    /// Adds several terms to a field.
    pub fn extend<I, S>(&mut self, field: &str, terms: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.fields.entry(field.to_string()).or_default();
        entry.extend(terms.into_iter().map(Into::into));
    }

    /// Returns the terms of a field.
    pub fn get(&self, field: &str) -> Option<&BTreeSet<String>> {
        self.fields.get(field)
    }

    /// Returns true if the field holds the term.
    pub fn contains(&self, field: &str, term: &str) -> bool {
        self.fields.get(field).is_some_and(|terms| terms.contains(term))
    }

    /// Iterates fields and their terms.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.fields.iter().map(|(f, t)| (f.as_str(), t))
    }

    /// Iterates every `(field, term)` pair.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .flat_map(|(f, terms)| terms.iter().map(move |t| (f.as_str(), t.as_str())))
    }

    /// Total number of terms across fields.
    pub fn len(&self) -> usize {
        self.fields.values().map(BTreeSet::len).sum()
    }

    /// Returns true if no field holds a term.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<F: Into<String>, T: Into<String>> FromIterator<(F, T)> for FieldTerms {
    fn from_iter<I: IntoIterator<Item = (F, T)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (field, term) in iter {
            out.add(field, term);
        }
        out
    }
}

/// A query over indexed presearch documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionQuery {
    /// Matches documents holding any of the terms in the field.
    Terms {
        /// Indexed field name.
        field: String,
        /// Alternative terms.
        terms: BTreeSet<String>,
    },
    /// Matches if any child matches. An empty disjunction matches nothing.
    Or(Vec<Self>),
    /// Matches if every child matches. An empty conjunction matches everything.
    And(Vec<Self>),
}

impl SelectionQuery {
    /// Creates a single-term query.
    pub fn term(field: impl Into<String>, term: impl Into<String>) -> Self {
        Self::Terms {
            field: field.into(),
            terms: BTreeSet::from([term.into()]),
        }
    }

    /// Evaluates the query against an indexed query document.
    pub fn matches(&self, doc: &FieldTerms) -> bool {
        match self {
            Self::Terms { field, terms } => doc
                .get(field)
                .is_some_and(|indexed| terms.iter().any(|t| indexed.contains(t))),
            Self::Or(children) => children.iter().any(|c| c.matches(doc)),
            Self::And(children) => children.iter().all(|c| c.matches(doc)),
        }
    }

    /// Number of term alternatives in the query.
    pub fn term_count(&self) -> usize {
        match self {
            Self::Terms { terms, .. } => terms.len(),
            Self::Or(children) | Self::And(children) => children.iter().map(Self::term_count).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_terms_pairs() {
        let terms: FieldTerms = [("b", "y"), ("a", "x"), ("a", "w")].into_iter().collect();
        let pairs: Vec<_> = terms.pairs().collect();
        assert_eq!(pairs, vec![("a", "w"), ("a", "x"), ("b", "y")]);
        assert_eq!(terms.len(), 3);
        assert!(terms.contains("a", "x"));
        assert!(!terms.contains("b", "x"));
    }

    #[test]
    fn selection_semantics() {
        let doc: FieldTerms = [("f", "a"), ("g", "b")].into_iter().collect();

        assert!(SelectionQuery::term("f", "a").matches(&doc));
        assert!(!SelectionQuery::term("g", "a").matches(&doc));
        assert!(
            SelectionQuery::Or(vec![
                SelectionQuery::term("f", "z"),
                SelectionQuery::term("g", "b"),
            ])
            .matches(&doc)
        );
        assert!(
            !SelectionQuery::And(vec![
                SelectionQuery::term("f", "a"),
                SelectionQuery::term("g", "z"),
            ])
            .matches(&doc)
        );
        assert!(!SelectionQuery::Or(Vec::new()).matches(&doc));
        assert!(SelectionQuery::And(Vec::new()).matches(&doc));
    }
}
