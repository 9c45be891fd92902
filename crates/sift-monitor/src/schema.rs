//! Schema of the presearch index.
//!
//! Every registered query is stored as one Tantivy document per disjunct:
//! - `id`: Query id (string, stored; deletions go through this field)
//! - `disjunct`: Position of the disjunct within the decomposed query (stored)
//! - `terms`: Presearch terms, each encoded as `field\u{1f}term` (raw string, multi-valued)
//! - `query`: Query text (stored only)
//! - `highlight`: Highlight query text, if any (stored only)
//! - `metadata`: Query metadata as JSON (stored only)
//! - `hash`: Hash of text, highlight and metadata (stored)

use tantivy::schema::{Field, STORED, STRING, Schema};

/// Separates the field from the term in an encoded presearch term.
pub const TERM_SEPARATOR: char = '\u{1f}';

/// Handles to all fields in the presearch schema.
#[derive(Debug, Clone)]
pub struct PresearchSchema {
    /// The underlying Tantivy schema.
    schema: Schema,
    /// Query id.
    pub id: Field,
    /// Disjunct position.
    pub disjunct: Field,
    /// Encoded presearch terms.
    pub terms: Field,
    /// Query text.
    pub query: Field,
    /// Highlight query text.
    pub highlight: Field,
    /// Metadata JSON.
    pub metadata: Field,
    /// Registration hash.
    pub hash: Field,
}

impl PresearchSchema {
    /// Creates the presearch schema.
    pub fn new() -> Self {
        let mut builder = Schema::builder();

        let id = builder.add_text_field("id", STRING | STORED);
        let disjunct = builder.add_u64_field("disjunct", STORED);
        // Terms are pre-analyzed, so the raw tokenizer keeps each one intact.
        let terms = builder.add_text_field("terms", STRING);
        let query = builder.add_text_field("query", STORED);
        let highlight = builder.add_text_field("highlight", STORED);
        let metadata = builder.add_text_field("metadata", STORED);
        let hash = builder.add_u64_field("hash", STORED);

        Self {
            schema: builder.build(),
            id,
            disjunct,
            terms,
            query,
            highlight,
            metadata,
            hash,
        }
    }

    /// Returns a reference to the underlying Tantivy schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl Default for PresearchSchema {
    fn default() -> Self {
        Self::new()
    }
}

/// Encodes a field and term into a single indexed token.
///
/// The field is prefixed with its byte length, so field names may contain the separator.
pub fn encode_term(field: &str, term: &str) -> String {
    format!("{}{TERM_SEPARATOR}{field}{term}", field.len())
}

/// Splits an encoded token back into field and term.
pub fn decode_term(encoded: &str) -> Option<(&str, &str)> {
    let (len, rest) = encoded.split_once(TERM_SEPARATOR)?;
    let len: usize = len.parse().ok()?;
    Some((rest.get(..len)?, rest.get(len..)?))
}

#[cfg(test)]
mod test {
    use tantivy::schema::FieldType;

    use super::*;

    #[test]
    fn schema_has_all_fields() {
        let schema = PresearchSchema::new();
        for name in ["id", "disjunct", "terms", "query", "highlight", "metadata", "hash"] {
            assert!(schema.schema().get_field(name).is_ok(), "missing {name}");
        }
    }

    #[test]
    fn terms_field_is_raw_and_not_stored() {
        let schema = PresearchSchema::new();
        let entry = schema.schema().get_field_entry(schema.terms);
        assert!(entry.is_indexed());
        assert!(!entry.is_stored());
        if let FieldType::Str(opts) = entry.field_type() {
            assert_eq!(opts.get_indexing_options().unwrap().tokenizer(), "raw");
        } else {
            panic!("terms field should be text type");
        }
    }

    #[test]
    fn query_text_is_stored_only() {
        let schema = PresearchSchema::new();
        let entry = schema.schema().get_field_entry(schema.query);
        assert!(entry.is_stored());
        assert!(!entry.is_indexed());
    }

    #[test]
    fn encoded_terms_round_trip() {
        let encoded = encode_term("text", "hello world");
        assert_eq!(decode_term(&encoded), Some(("text", "hello world")));
        assert_eq!(decode_term("no separator"), None);
        assert_eq!(decode_term("9\u{1f}short"), None);
    }

    #[test]
    fn separator_in_field_names_survives_decoding() {
        let field = "odd\u{1f}field";
        let encoded = encode_term(field, "te\u{1f}rm");
        assert_eq!(decode_term(&encoded), Some((field, "te\u{1f}rm")));
        assert_ne!(encoded, encode_term("odd", "field\u{1f}te\u{1f}rm"));
    }
}
