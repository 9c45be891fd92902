//! Error types for the sift-monitor crate.

use std::{fmt, io, path::PathBuf};

use serde::Serialize;
use sift_query::QueryError;
use thiserror::Error;

/// Systemic failures of the monitor and its indexes.
///
/// These abort the operation that hit them. Failures confined to a single query are
/// reported through [`UpdateError`] and [`MatchError`] instead.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Failed to open or create an index.
    #[error("failed to open index at {path}: {message}")]
    OpenIndex {
        /// Path to the index directory, empty for in-memory indexes.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Failed to write to an index.
    #[error("failed to write to index: {0}")]
    Write(String),

    /// Failed to commit changes to an index.
    #[error("failed to commit index: {0}")]
    Commit(String),

    /// Failed to read from an index.
    #[error("failed to read index: {0}")]
    Read(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid stemmer language.
    #[error("unsupported stemmer language: {0}")]
    InvalidLanguage(String),

    /// A stored query could not be restored from the index.
    #[error("stored query {id} is corrupt: {message}")]
    CorruptQuery {
        /// Query id.
        id: String,
        /// What was wrong with it.
        message: String,
    },

    /// The worker pool for partitioned matching could not be built.
    #[error("failed to start match workers: {0}")]
    WorkerPool(String),

    /// A match worker panicked.
    #[error("match worker panicked")]
    WorkerPanicked,
}

impl MonitorError {
    /// Creates an `OpenIndex` error from a path and Tantivy error.
    pub(crate) fn open_index(path: PathBuf, source: &tantivy::TantivyError) -> Self {
        Self::OpenIndex {
            path,
            message: source.to_string(),
        }
    }

    /// Creates a `Write` error from a Tantivy error.
    pub(crate) fn write(source: &tantivy::TantivyError) -> Self {
        Self::Write(source.to_string())
    }

    /// Creates a `Commit` error from a Tantivy error.
    pub(crate) fn commit(source: &tantivy::TantivyError) -> Self {
        Self::Commit(source.to_string())
    }

    /// Creates a `Read` error from a Tantivy error.
    pub(crate) fn read(source: &tantivy::TantivyError) -> Self {
        Self::Read(source.to_string())
    }
}

/// A query that could not be registered.
#[derive(Debug, Clone)]
pub struct UpdateError {
    /// Id of the rejected query.
    pub query_id: String,
    /// Why it was rejected.
    pub error: QueryError,
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query {}: {}", self.query_id, self.error.message())
    }
}

/// A candidate query whose evaluation against a document failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchError {
    /// Id of the failing query.
    pub query_id: String,
    /// Failure description.
    pub message: String,
}

impl MatchError {
    /// Creates a match error.
    pub fn new(query_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query {}: {}", self.query_id, self.message)
    }
}
