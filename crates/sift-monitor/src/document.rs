//! Input documents and their in-memory index.
//!
//! Candidate queries are evaluated against a single document. [`DocumentIndex`] indexes
//! that document in a RAM-backed Tantivy index with one text field per document field,
//! and keeps the analyzed tokens for presearch term extraction and highlighting.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sift_presearch::FieldTerms;
use tantivy::{
    DocAddress, Index, IndexWriter, ReloadPolicy, Searcher, TantivyDocument,
    schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions},
    tokenizer::{TextAnalyzer, Token},
};
use tracing::debug;

use crate::{
    MonitorError,
    analyzer::{SIFT_TOKENIZER, analyze},
};

/// Heap for the single-document writer; Tantivy's per-thread minimum.
const DOCUMENT_HEAP_SIZE: usize = 15_000_000;

/// A document to match against registered queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct InputDocument {
    /// Document id, echoed in match results.
    pub id: String,
    /// Field name to field text.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl InputDocument {
    /// Creates a document without fields.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field.
    pub fn with_field(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.fields.insert(name.into(), text.into());
        self
    }
}

/// A single document indexed in memory.
pub struct DocumentIndex {
    /// Document id.
    id: String,
    /// Searcher over the one-document index.
    searcher: Searcher,
    /// Field handles by document field name.
    fields: BTreeMap<String, Field>,
    /// Analyzed tokens by field name.
    tokens: BTreeMap<String, Vec<Token>>,
    /// Distinct analyzed terms by field name.
    terms: FieldTerms,
}

impl DocumentIndex {
    /// Analyzes and indexes a document.
    pub fn build(document: &InputDocument, analyzer: &TextAnalyzer) -> Result<Self, MonitorError> {
        let mut builder = Schema::builder();
        let text_options = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(SIFT_TOKENIZER)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );

        let mut fields = BTreeMap::new();
        for name in document.fields.keys() {
            if name.is_empty() {
                debug!(document = %document.id, "skipping unnamed field");
                continue;
            }
            fields.insert(name.clone(), builder.add_text_field(name, text_options.clone()));
        }

        let index = Index::create_in_ram(builder.build());
        index.tokenizers().register(SIFT_TOKENIZER, analyzer.clone());

        let mut writer: IndexWriter = index
            .writer_with_num_threads(1, DOCUMENT_HEAP_SIZE)
            .map_err(|e| MonitorError::write(&e))?;

        let mut doc = TantivyDocument::new();
        let mut tokens = BTreeMap::new();
        let mut terms = FieldTerms::new();
        for (name, field) in &fields {
            let text = document.fields.get(name).map_or("", String::as_str);
            doc.add_text(*field, text);
            let field_tokens = analyze(analyzer, text);
            terms.extend(name, field_tokens.iter().map(|t| t.text.clone()));
            tokens.insert(name.clone(), field_tokens);
        }

        writer
            .add_document(doc)
            .map_err(|e| MonitorError::write(&e))?;
        writer.commit().map_err(|e| MonitorError::commit(&e))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| MonitorError::read(&e))?;

        Ok(Self {
            id: document.id.clone(),
            searcher: reader.searcher(),
            fields,
            tokens,
            terms,
        })
    }

    /// Returns the document id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the searcher over the document.
    pub fn searcher(&self) -> &Searcher {
        &self.searcher
    }

    /// Returns the address of the indexed document.
    pub fn address(&self) -> DocAddress {
        DocAddress::new(0, 0)
    }

    /// Returns the handle of a document field.
    pub fn field(&self, name: &str) -> Option<Field> {
        self.fields.get(name).copied()
    }

    /// Returns the analyzed tokens of a field, in order.
    pub fn tokens(&self, name: &str) -> &[Token] {
        self.tokens.get(name).map_or(&[], Vec::as_slice)
    }

    /// Returns the distinct terms of a field.
    pub fn field_terms(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.terms.get(name)
    }

    /// Returns the distinct terms of every field.
    pub fn terms(&self) -> &FieldTerms {
        &self.terms
    }
}

#[cfg(test)]
mod test {
    use tantivy::{Term, collector::Count, query::TermQuery};

    use super::*;
    use crate::analyzer::build_analyzer;

    fn index(document: &InputDocument) -> DocumentIndex {
        DocumentIndex::build(document, &build_analyzer(None)).unwrap()
    }

    #[test]
    fn indexes_every_field() {
        let doc = index(
            &InputDocument::new("d")
                .with_field("title", "Hello World")
                .with_field("body", "some text about the world"),
        );

        assert_eq!(doc.id(), "d");
        assert!(doc.field("title").is_some());
        assert!(doc.field("missing").is_none());
        assert!(doc.terms().contains("title", "hello"));
        assert!(doc.terms().contains("body", "world"));
        assert_eq!(doc.tokens("body").len(), 5);
        assert!(doc.tokens("missing").is_empty());
    }

    #[test]
    fn document_is_searchable() {
        let doc = index(&InputDocument::new("d").with_field("f", "some text"));
        let field = doc.field("f").unwrap();

        let hit = TermQuery::new(
            Term::from_field_text(field, "text"),
            IndexRecordOption::Basic,
        );
        assert_eq!(doc.searcher().search(&hit, &Count).unwrap(), 1);

        let miss = TermQuery::new(
            Term::from_field_text(field, "cheese"),
            IndexRecordOption::Basic,
        );
        assert_eq!(doc.searcher().search(&miss, &Count).unwrap(), 0);
    }

    #[test]
    fn empty_document_builds() {
        let doc = index(&InputDocument::new("empty"));
        assert!(doc.terms().is_empty());
    }

    #[test]
    fn deserializes_json() {
        let doc: InputDocument =
            serde_json::from_str(r#"{"id": "1", "fields": {"f": "some text"}}"#).unwrap();
        assert_eq!(doc, InputDocument::new("1").with_field("f", "some text"));
    }
}
