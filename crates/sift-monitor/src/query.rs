//! Queries as registered with the monitor.

use serde::{Deserialize, Serialize};
use sift_presearch::Metadata;

/// A query to register: id, query text, optional highlight text and metadata.
///
/// Registering a query under an existing id replaces the earlier registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MonitorQuery {
    /// Unique query id.
    pub id: String,
    /// Query text in the query language.
    pub query: String,
    /// Query used to report highlights instead of `query`, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
    /// Free-form metadata, available to presearcher filters.
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl MonitorQuery {
    /// Creates a query without highlight text or metadata.
    pub fn new(id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            query: query.into(),
            highlight: None,
            metadata: Metadata::new(),
        }
    }

    /// Sets the highlight query text.
    pub fn with_highlight(mut self, highlight: impl Into<String>) -> Self {
        self.highlight = Some(highlight.into());
        self
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
