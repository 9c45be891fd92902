//! Metadata field filtering.
//!
//! With a filter field `F`, a query registered with metadata `F = v` is only a candidate
//! for documents whose field `F` contains `v`. Queries registered without the metadata key
//! are indexed under the any token and stay candidates for every document. Documents that
//! do not carry field `F` at all are not filtered.

use std::{fmt, sync::Arc};

use crate::{
    builder::TreeBuilder,
    selection::{FieldTerms, SelectionQuery},
    term::ANY_TOKEN,
    tree::QueryTree,
};

use super::{Metadata, Presearcher, TermFilter};

/// Prefix of the indexed field holding filter values.
pub const FILTER_FIELD_PREFIX: &str = "__filter_";

/// Splits a metadata value into the tokens compared against document tokens.
pub type MetadataTokenizer = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// Wraps a presearcher with a metadata field filter.
pub struct FieldFilterPresearcher {
    /// Wrapped presearcher.
    inner: Box<dyn Presearcher>,
    /// Document field and metadata key to filter on.
    field: String,
    /// Indexed field holding filter values.
    indexed_field: String,
    /// Tokenizer applied to metadata values.
    tokenizer: MetadataTokenizer,
}

impl fmt::Debug for FieldFilterPresearcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldFilterPresearcher")
            .field("field", &self.field)
            .finish_non_exhaustive()
    }
}

impl FieldFilterPresearcher {
    /// Creates a filter on `field`. Metadata values are indexed verbatim.
    pub fn new(inner: Box<dyn Presearcher>, field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            inner,
            indexed_field: format!("{FILTER_FIELD_PREFIX}{field}"),
            field,
            tokenizer: Arc::new(|value: &str| vec![value.to_string()]),
        }
    }

    /// Tokenizes metadata values with the given function, typically the document analyzer.
    pub fn with_tokenizer(mut self, tokenizer: MetadataTokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Returns the filtered field.
    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Presearcher for FieldFilterPresearcher {
    fn builder(&self) -> &TreeBuilder {
        self.inner.builder()
    }

    fn index_query(&self, tree: &QueryTree, metadata: &Metadata) -> FieldTerms {
        let mut doc = self.inner.index_query(tree, metadata);
        let values = metadata
            .get(&self.field)
            .map(|value| (self.tokenizer)(value.as_str()))
            .unwrap_or_default();
        if values.is_empty() {
            doc.add(self.indexed_field.clone(), ANY_TOKEN);
        } else {
            doc.extend(&self.indexed_field, values);
        }
        doc
    }

    fn build_query(&self, document: &FieldTerms, filter: &dyn TermFilter) -> SelectionQuery {
        let query = self.inner.build_query(document, filter);
        let Some(values) = document.get(&self.field).filter(|v| !v.is_empty()) else {
            return query;
        };

        let mut terms = values.clone();
        terms.insert(ANY_TOKEN.to_string());
        SelectionQuery::And(vec![
            query,
            SelectionQuery::Terms {
                field: self.indexed_field.clone(),
                terms,
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use sift_query::{ParseOptions, parse};

    use super::*;
    use crate::presearcher::{AcceptAll, MultipassPresearcher, TermPresearcher};

    fn filtered(inner: Box<dyn Presearcher>) -> FieldFilterPresearcher {
        FieldFilterPresearcher::new(inner, "language")
    }

    fn index(p: &FieldFilterPresearcher, query: &str, language: Option<&str>) -> FieldTerms {
        let expr = parse(query, &ParseOptions::new("text")).unwrap().unwrap();
        let mut metadata = Metadata::new();
        if let Some(language) = language {
            metadata.insert("language".into(), language.into());
        }
        p.index_query(&p.build_tree(&expr), &metadata)
    }

    fn document(text: &str, languages: &[&str]) -> FieldTerms {
        let mut doc: FieldTerms = text.split_whitespace().map(|t| ("text", t)).collect();
        doc.extend("language", languages.iter().copied());
        doc
    }

    fn check(p: &FieldFilterPresearcher) {
        let q1 = index(p, "test", Some("en"));
        let q2 = index(p, "test", Some("de"));
        let q3 = index(p, "wibble", Some("en"));
        let q4 = index(p, "*:*", Some("de"));
        let q5 = index(p, "test", None);

        let en = p.build_query(&document("this is a test", &["en"]), &AcceptAll);
        let selected: Vec<bool> = [&q1, &q2, &q3, &q4, &q5].iter().map(|q| en.matches(q)).collect();
        assert_eq!(selected, vec![true, false, false, false, true]);

        let de = p.build_query(&document("das ist ein test", &["de"]), &AcceptAll);
        let selected: Vec<bool> = [&q1, &q2, &q3, &q4, &q5].iter().map(|q| de.matches(q)).collect();
        assert_eq!(selected, vec![false, true, false, true, true]);

        let both = p.build_query(&document("this is ein test", &["en", "de"]), &AcceptAll);
        let selected: Vec<bool> = [&q1, &q2, &q3, &q4, &q5].iter().map(|q| both.matches(q)).collect();
        assert_eq!(selected, vec![true, true, false, true, true]);

        let none = p.build_query(&document("a test", &[]), &AcceptAll);
        let selected: Vec<bool> = [&q1, &q2, &q3, &q4, &q5].iter().map(|q| none.matches(q)).collect();
        assert_eq!(selected, vec![true, true, false, true, true]);
    }

    #[test]
    fn filters_single_pass() {
        check(&filtered(Box::new(TermPresearcher::default())));
    }

    #[test]
    fn filters_multipass() {
        check(&filtered(Box::new(MultipassPresearcher::default())));
    }

    #[test]
    fn custom_tokenizer_normalizes_values() {
        let p = filtered(Box::new(TermPresearcher::default()))
            .with_tokenizer(Arc::new(|v: &str| vec![v.to_lowercase()]));
        let q = index(&p, "test", Some("EN"));
        assert!(p.build_query(&document("test", &["en"]), &AcceptAll).matches(&q));
    }
}
