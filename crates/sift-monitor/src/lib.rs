//! Reverse search over a tantivy presearch index.
//!
//! A [`Monitor`] holds registered queries and matches incoming documents against them.
//! Each query is split into disjuncts whose presearch terms are stored in a tantivy
//! index. A document is indexed in memory, its terms select candidate disjuncts from
//! the presearch index, and only those candidates are evaluated by a
//! [`CandidateMatcher`]:
//!
//! - [`SimpleMatcher`] reports which queries matched
//! - [`ScoringMatcher`] adds the document score
//! - [`ExplainingMatcher`] adds a score explanation
//! - [`HighlightingMatcher`] reports the positions and offsets of matching terms
//!
//! Candidates are evaluated serially, on a worker pool, or in partitions on a rayon pool,
//! depending on the [`MatchStrategy`].
//!
//! # Example
//!
//! ```
//! use sift_config::Config;
//! use sift_monitor::{InputDocument, Monitor, MonitorQuery, SimpleMatcher};
//!
//! let mut monitor = Monitor::new(&Config::default()).unwrap();
//! monitor
//!     .update([
//!         MonitorQuery::new("greeting", "hello"),
//!         MonitorQuery::new("farewell", "+goodbye +world"),
//!     ])
//!     .unwrap();
//!
//! let document = InputDocument::new("doc").with_field("text", "hello there");
//! let matches = monitor.match_document(&document, &SimpleMatcher::new).unwrap();
//! assert!(matches.contains("greeting"));
//! assert!(!matches.contains("farewell"));
//! ```

#![warn(missing_docs)]

mod analyzer;
mod compile;
mod document;
mod error;
mod hash;
mod index;
mod matcher;
mod matches;
mod monitor;
mod query;
mod schema;
mod strategy;

pub use analyzer::{
    SIFT_TOKENIZER, analyze, analyze_query, build_analyzer, build_analyzer_from_name,
    parse_language, tokenize,
};
pub use compile::{CompileError, QueryCompiler};
pub use document::{DocumentIndex, InputDocument};
pub use error::{MatchError, MonitorError, UpdateError};
pub use hash::{SETTINGS_HASH_FILE, query_hash, settings_hash};
pub use index::{Candidate, PresearchIndex, StoredQuery};
pub use matcher::{
    CandidateMatcher, ExplainingMatcher, ExplanationMatch, HighlightingMatcher, HighlightsMatch,
    Hit, MatchOf, MatcherError, MatcherFactory, QueryMatch, ScoringMatch, ScoringMatcher,
    SimpleMatcher,
};
pub use matches::{MatchTimings, Matches, SlowQuery};
pub use monitor::{Monitor, MonitorBuilder, MonitorStats, UpdateResult, build_presearcher};
pub use query::MonitorQuery;
pub use strategy::{MatchStrategy, MatchTask};
