//! The presearch index.
//!
//! Holds one Tantivy document per registered query disjunct, carrying its presearch terms
//! and the registration it came from. Candidate selection compiles a [`SelectionQuery`]
//! into a Tantivy query over the encoded `terms` field.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use sift_presearch::{FieldTerms, Metadata, SelectionQuery};
use tantivy::{
    Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term,
    collector::DocSetCollector,
    directory::MmapDirectory,
    query::{AllQuery, BooleanQuery, EmptyQuery, Occur, Query, TermQuery},
    schema::{IndexRecordOption, Value},
};
use tracing::debug;

use crate::{
    MonitorError,
    query::MonitorQuery,
    schema::{PresearchSchema, decode_term, encode_term},
};

/// Default heap size for the index writer (50 MB).
const DEFAULT_HEAP_SIZE: usize = 50_000_000;

/// A candidate selected by the presearcher: query id and disjunct position.
pub type Candidate = (String, usize);

/// A registration read back from the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredQuery {
    /// The registered query.
    pub query: MonitorQuery,
    /// Its registration hash.
    pub hash: u64,
}

/// Tantivy index of presearch documents.
pub struct PresearchIndex {
    /// The index writer.
    writer: IndexWriter,
    /// Reader, reloaded after every commit.
    reader: IndexReader,
    /// Schema with field handles.
    schema: PresearchSchema,
    /// Index directory, `None` for in-memory indexes.
    path: Option<PathBuf>,
}

impl PresearchIndex {
    /// Creates an in-memory index.
    pub fn in_memory() -> Result<Self, MonitorError> {
        let schema = PresearchSchema::new();
        let index = Index::create_in_ram(schema.schema().clone());
        Self::from_index(&index, schema, None)
    }

    /// Opens or creates an index at the given path.
    pub fn open(path: &Path) -> Result<Self, MonitorError> {
        let schema = PresearchSchema::new();
        fs::create_dir_all(path)?;

        let dir = MmapDirectory::open(path).map_err(|e| {
            let err: tantivy::TantivyError = e.into();
            MonitorError::open_index(path.to_path_buf(), &err)
        })?;
        let index = Index::open_or_create(dir, schema.schema().clone())
            .map_err(|e| MonitorError::open_index(path.to_path_buf(), &e))?;

        Self::from_index(&index, schema, Some(path.to_path_buf()))
    }

    /// Creates the writer and reader for an index.
    fn from_index(
        index: &Index,
        schema: PresearchSchema,
        path: Option<PathBuf>,
    ) -> Result<Self, MonitorError> {
        let location = path.clone().unwrap_or_default();
        let writer = index
            .writer(DEFAULT_HEAP_SIZE)
            .map_err(|e| MonitorError::open_index(location.clone(), &e))?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| MonitorError::open_index(location, &e))?;

        Ok(Self {
            writer,
            reader,
            schema,
            path,
        })
    }

    /// Returns the index directory, `None` for in-memory indexes.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Stages one disjunct of a registered query.
    pub fn add_disjunct(
        &mut self,
        query: &MonitorQuery,
        hash: u64,
        disjunct: usize,
        terms: &FieldTerms,
    ) -> Result<(), MonitorError> {
        let s = &self.schema;
        let mut doc = TantivyDocument::new();
        doc.add_text(s.id, &query.id);
        doc.add_u64(s.disjunct, disjunct as u64);
        for (field, term) in terms.pairs() {
            doc.add_text(s.terms, encode_term(field, term));
        }
        doc.add_text(s.query, &query.query);
        if let Some(highlight) = &query.highlight {
            doc.add_text(s.highlight, highlight);
        }
        let metadata =
            serde_json::to_string(&query.metadata).map_err(|e| MonitorError::Write(e.to_string()))?;
        doc.add_text(s.metadata, metadata);
        doc.add_u64(s.hash, hash);

        self.writer
            .add_document(doc)
            .map_err(|e| MonitorError::write(&e))?;
        Ok(())
    }

    /// Stages deletion of every disjunct of a query.
    pub fn delete(&mut self, id: &str) {
        let term = Term::from_field_text(self.schema.id, id);
        self.writer.delete_term(term);
    }

    /// Stages deletion of every document.
    pub fn delete_all(&mut self) -> Result<(), MonitorError> {
        self.writer
            .delete_all_documents()
            .map_err(|e| MonitorError::write(&e))?;
        Ok(())
    }

    /// Commits staged changes and refreshes the reader.
    pub fn commit(&mut self) -> Result<(), MonitorError> {
        self.writer
            .commit()
            .map_err(|e| MonitorError::commit(&e))?;
        self.reader.reload().map_err(|e| MonitorError::read(&e))?;
        Ok(())
    }

    /// Returns a searcher over the last commit.
    fn searcher(&self) -> Searcher {
        self.reader.searcher()
    }

    /// Number of committed presearch documents.
    pub fn num_docs(&self) -> u64 {
        self.searcher().num_docs()
    }

    /// Returns the disjuncts selected by a presearch query, sorted.
    pub fn candidates(&self, selection: &SelectionQuery) -> Result<Vec<Candidate>, MonitorError> {
        let query = self.compile_selection(selection);
        let searcher = self.searcher();
        let addresses = searcher
            .search(query.as_ref(), &DocSetCollector)
            .map_err(|e| MonitorError::read(&e))?;

        let mut candidates = Vec::with_capacity(addresses.len());
        for address in addresses {
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| MonitorError::read(&e))?;
            let id = doc.get_first(self.schema.id).and_then(|v| v.as_str());
            let disjunct = doc.get_first(self.schema.disjunct).and_then(|v| v.as_u64());
            match (id, disjunct) {
                (Some(id), Some(disjunct)) => candidates.push((id.to_string(), disjunct as usize)),
                _ => debug!(?address, "presearch document without id"),
            }
        }
        candidates.sort();
        Ok(candidates)
    }

    /// Compiles a selection query into a Tantivy query over the terms field.
    fn compile_selection(&self, selection: &SelectionQuery) -> Box<dyn Query> {
        match selection {
            SelectionQuery::Terms { field, terms } => {
                let mut clauses: Vec<(Occur, Box<dyn Query>)> = terms
                    .iter()
                    .map(|term| {
                        let query: Box<dyn Query> = Box::new(TermQuery::new(
                            Term::from_field_text(self.schema.terms, &encode_term(field, term)),
                            IndexRecordOption::Basic,
                        ));
                        (Occur::Should, query)
                    })
                    .collect();
                match clauses.len() {
                    0 => Box::new(EmptyQuery),
                    1 => clauses.remove(0).1,
                    _ => Box::new(BooleanQuery::new(clauses)),
                }
            }
            SelectionQuery::Or(children) => {
                if children.is_empty() {
                    return Box::new(EmptyQuery);
                }
                self.compile_children(children, Occur::Should)
            }
            SelectionQuery::And(children) => {
                if children.is_empty() {
                    return Box::new(AllQuery);
                }
                self.compile_children(children, Occur::Must)
            }
        }
    }

    /// Compiles selection children into one boolean query.
    fn compile_children(&self, children: &[SelectionQuery], occur: Occur) -> Box<dyn Query> {
        let clauses = children
            .iter()
            .map(|child| (occur, self.compile_selection(child)))
            .collect();
        Box::new(BooleanQuery::new(clauses))
    }

    /// Returns every indexed presearch term, by field.
    ///
    /// Terms of deleted documents remain until their segments merge, so the result may
    /// hold more terms than live documents use.
    pub fn indexed_terms(&self) -> Result<FieldTerms, MonitorError> {
        let searcher = self.searcher();
        let mut out = FieldTerms::new();
        for segment_reader in searcher.segment_readers() {
            let inverted_index = segment_reader
                .inverted_index(self.schema.terms)
                .map_err(|e| MonitorError::Read(e.to_string()))?;
            let mut stream = inverted_index
                .terms()
                .stream()
                .map_err(|e| MonitorError::Read(e.to_string()))?;
            while stream.advance() {
                if let Ok(encoded) = str::from_utf8(stream.key())
                    && let Some((field, term)) = decode_term(encoded)
                {
                    out.add(field, term);
                }
            }
        }
        Ok(out)
    }

    /// Reads back every registration, one per query id.
    pub fn stored_queries(&self) -> Result<Vec<StoredQuery>, MonitorError> {
        let searcher = self.searcher();
        let addresses = searcher
            .search(&AllQuery, &DocSetCollector)
            .map_err(|e| MonitorError::read(&e))?;

        let mut queries = BTreeMap::new();
        for address in addresses {
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| MonitorError::read(&e))?;
            let stored = self.read_stored(&doc)?;
            queries.entry(stored.query.id.clone()).or_insert(stored);
        }
        Ok(queries.into_values().collect())
    }

    /// Decodes a stored registration.
    fn read_stored(&self, doc: &TantivyDocument) -> Result<StoredQuery, MonitorError> {
        let s = &self.schema;
        let text = |field| doc.get_first(field).and_then(|v| v.as_str()).map(str::to_string);

        let id = text(s.id).unwrap_or_default();
        let corrupt = |message: &str| MonitorError::CorruptQuery {
            id: id.clone(),
            message: message.to_string(),
        };

        let query = text(s.query).ok_or_else(|| corrupt("missing query text"))?;
        let metadata: Metadata = match text(s.metadata) {
            Some(json) => serde_json::from_str(&json).map_err(|e| corrupt(&e.to_string()))?,
            None => Metadata::new(),
        };
        let hash = doc
            .get_first(s.hash)
            .and_then(|v| v.as_u64())
            .ok_or_else(|| corrupt("missing hash"))?;

        Ok(StoredQuery {
            query: MonitorQuery {
                id,
                query,
                highlight: text(s.highlight),
                metadata,
            },
            hash,
        })
    }
}
