//! The query monitor.
//!
//! A [`Monitor`] owns the registered queries and the presearch index. Registering a
//! query parses and analyzes it, splits it into disjuncts and indexes each disjunct's
//! presearch terms. Matching a document indexes it in memory, selects candidate
//! disjuncts from the presearch index and evaluates them with a matcher.

mod builder;

use std::{
    collections::BTreeMap,
    path::Path,
    sync::Arc,
    time::{Duration, Instant, SystemTime},
};

pub use builder::{MonitorBuilder, build_presearcher};
use sift_config::Config;
use sift_presearch::{FieldTerms, Presearcher, QueryDecomposer};
use sift_query::{ParseOptions, QueryError, QueryExpr, parse};
use tantivy::tokenizer::TextAnalyzer;
use tracing::{debug, info, warn};

use crate::{
    MonitorError, UpdateError,
    analyzer::analyze_query,
    document::{DocumentIndex, InputDocument},
    hash::{query_hash, read_settings_hash, write_settings_hash},
    index::{Candidate, PresearchIndex},
    matcher::{MatchOf, MatcherFactory},
    matches::{MatchTimings, Matches},
    query::MonitorQuery,
    strategy::{MatchStrategy, MatchTask},
};

/// Outcome of registering a batch of queries.
#[derive(Debug, Clone, Default)]
pub struct UpdateResult {
    /// Queries indexed.
    pub indexed: usize,
    /// Queries skipped because an identical registration already exists.
    pub unchanged: usize,
    /// Queries rejected.
    pub errors: Vec<UpdateError>,
}

impl UpdateResult {
    /// Returns true if no query was rejected.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Summary of the monitor's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorStats {
    /// Registered queries.
    pub queries: usize,
    /// Indexed disjuncts across all queries.
    pub disjuncts: usize,
    /// Time of the last committed change.
    pub last_update: Option<SystemTime>,
}

/// A registered query in its parsed form.
#[derive(Debug, Clone)]
struct CachedQuery {
    /// The registration.
    query: MonitorQuery,
    /// Registration hash.
    hash: u64,
    /// Analyzed disjuncts of the match expression.
    disjuncts: Vec<Arc<QueryExpr>>,
    /// Analyzed highlight expression.
    highlight: Option<Arc<QueryExpr>>,
}

/// Matches documents against registered queries.
pub struct Monitor {
    /// Presearch index.
    index: PresearchIndex,
    /// Extracts presearch terms and builds selection queries.
    presearcher: Box<dyn Presearcher>,
    /// Splits queries into separately indexed disjuncts.
    decomposer: QueryDecomposer,
    /// Analyzer shared by queries and documents.
    analyzer: TextAnalyzer,
    /// Query parser options.
    parse_options: ParseOptions,
    /// Registered queries by id.
    queries: BTreeMap<String, CachedQuery>,
    /// Every term in the presearch index, used to drop useless document terms.
    indexed_terms: FieldTerms,
    /// Candidate evaluation strategy.
    strategy: MatchStrategy,
    /// Evaluations slower than this are recorded in the slow log.
    slow_log_threshold: Duration,
    /// Queries indexed between commits.
    commit_batch_size: usize,
    /// Time of the last committed change.
    last_update: Option<SystemTime>,
}

impl Monitor {
    /// Creates a monitor with an in-memory index.
    pub fn new(config: &Config) -> Result<Self, MonitorError> {
        MonitorBuilder::new(config.clone()).build()
    }

    /// Opens a monitor whose index lives in `path`, restoring stored queries.
    pub fn open(path: &Path, config: &Config) -> Result<Self, MonitorError> {
        MonitorBuilder::new(config.clone()).path(path).build()
    }

    /// Returns a builder for finer control over construction.
    pub fn builder(config: Config) -> MonitorBuilder {
        MonitorBuilder::new(config)
    }

    /// Creates a monitor from its parts.
    pub(crate) fn from_parts(
        index: PresearchIndex,
        presearcher: Box<dyn Presearcher>,
        analyzer: TextAnalyzer,
        strategy: MatchStrategy,
        config: &Config,
    ) -> Self {
        Self {
            index,
            presearcher,
            decomposer: QueryDecomposer,
            analyzer,
            parse_options: ParseOptions::new(config.monitor.default_field.clone()),
            queries: BTreeMap::new(),
            indexed_terms: FieldTerms::new(),
            strategy,
            slow_log_threshold: config.monitor.slow_log_threshold,
            commit_batch_size: config.monitor.commit_batch_size.max(1),
            last_update: None,
        }
    }

    /// Registers queries, replacing earlier registrations with the same id.
    ///
    /// Queries that fail to parse are reported in the result and leave any earlier
    /// registration in place; the rest of the batch is still indexed.
    pub fn update<I>(&mut self, queries: I) -> Result<UpdateResult, MonitorError>
    where
        I: IntoIterator<Item = MonitorQuery>,
    {
        let mut result = UpdateResult::default();
        let mut pending = 0;

        for query in queries {
            let hash = query_hash(&query);
            if self.queries.get(&query.id).is_some_and(|c| c.hash == hash) {
                debug!(query_id = %query.id, "query unchanged");
                result.unchanged += 1;
                continue;
            }

            let cached = match self.prepare(query, hash) {
                Ok(cached) => cached,
                Err(error) => {
                    warn!(query_id = %error.query_id, error = %error.error.message(), "query rejected");
                    result.errors.push(error);
                    continue;
                }
            };

            self.index_query(&cached)?;
            self.queries.insert(cached.query.id.clone(), cached);
            result.indexed += 1;
            pending += 1;

            if pending >= self.commit_batch_size {
                self.commit()?;
                pending = 0;
            }
        }

        if pending > 0 {
            self.commit()?;
        }
        info!(
            indexed = result.indexed,
            unchanged = result.unchanged,
            errors = result.errors.len(),
            "update complete"
        );
        Ok(result)
    }

    /// Removes queries by id. Unknown ids are ignored.
    pub fn delete<I, S>(&mut self, ids: I) -> Result<(), MonitorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut deleted = 0;
        for id in ids {
            let id = id.as_ref();
            self.index.delete(id);
            if self.queries.remove(id).is_some() {
                deleted += 1;
            }
        }
        self.commit()?;
        info!(deleted, "queries deleted");
        Ok(())
    }

    /// Removes every query.
    pub fn clear(&mut self) -> Result<(), MonitorError> {
        self.index.delete_all()?;
        self.queries.clear();
        self.commit()?;
        info!("monitor cleared");
        Ok(())
    }

    /// Matches a document against the registered queries.
    ///
    /// Evaluation failures of single queries are reported in [`Matches::errors`].
    pub fn match_document<F: MatcherFactory>(
        &self,
        document: &InputDocument,
        factory: &F,
    ) -> Result<Matches<MatchOf<F>>, MonitorError> {
        let start = Instant::now();
        let doc_index = Arc::new(DocumentIndex::build(document, &self.analyzer)?);
        let candidates = self.select(&doc_index)?;
        let presearcher_hits = candidates.len();

        let tasks: Vec<MatchTask> = candidates
            .into_iter()
            .filter_map(|(query_id, disjunct)| {
                let cached = self.queries.get(&query_id)?;
                let query = Arc::clone(cached.disjuncts.get(disjunct)?);
                Some(MatchTask {
                    query_id,
                    query,
                    highlight: cached.highlight.clone(),
                })
            })
            .collect();
        let presearch = start.elapsed();

        let batch = self
            .strategy
            .run(factory, &doc_index, tasks, self.slow_log_threshold)?;
        let matching = start.elapsed().saturating_sub(presearch);

        debug!(
            document = %document.id,
            presearcher_hits,
            queries_run = batch.queries_run,
            matches = batch.matches.len(),
            ?presearch,
            ?matching,
            "document matched"
        );

        Ok(Matches {
            document_id: document.id.clone(),
            matches: batch.matches,
            presearcher_hits,
            queries_run: batch.queries_run,
            errors: batch.errors,
            slow_log: batch.slow_log,
            timings: MatchTimings {
                presearch,
                matching,
            },
        })
    }

    /// Returns the ids of the queries the presearcher selects for a document, without
    /// evaluating them.
    pub fn presearcher_candidates(
        &self,
        document: &InputDocument,
    ) -> Result<Vec<String>, MonitorError> {
        let doc_index = DocumentIndex::build(document, &self.analyzer)?;
        let mut ids: Vec<String> = self
            .select(&doc_index)?
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        ids.dedup();
        Ok(ids)
    }

    /// Returns a registered query.
    pub fn query(&self, id: &str) -> Option<&MonitorQuery> {
        self.queries.get(id).map(|c| &c.query)
    }

    /// Number of registered queries.
    pub fn query_count(&self) -> usize {
        self.queries.len()
    }

    /// Ids of the registered queries, sorted.
    pub fn query_ids(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }

    /// Number of indexed disjuncts across all queries.
    pub fn disjunct_count(&self) -> usize {
        self.queries.values().map(|c| c.disjuncts.len()).sum()
    }

    /// Returns a summary of the monitor's contents.
    pub fn stats(&self) -> MonitorStats {
        MonitorStats {
            queries: self.query_count(),
            disjuncts: self.disjunct_count(),
            last_update: self.last_update,
        }
    }

    /// Sets the duration above which evaluations are recorded in the slow log.
    pub fn set_slow_log_threshold(&mut self, threshold: Duration) {
        self.slow_log_threshold = threshold;
    }

    /// Returns the slow-log threshold.
    pub fn slow_log_threshold(&self) -> Duration {
        self.slow_log_threshold
    }

    /// Returns the presearcher.
    pub fn presearcher(&self) -> &dyn Presearcher {
        self.presearcher.as_ref()
    }

    /// Returns the index directory, `None` for in-memory monitors.
    pub fn path(&self) -> Option<&Path> {
        self.index.path()
    }

    /// Selects candidate disjuncts for an indexed document.
    fn select(&self, document: &DocumentIndex) -> Result<Vec<Candidate>, MonitorError> {
        let selection = self
            .presearcher
            .build_query(document.terms(), &self.indexed_terms);
        self.index.candidates(&selection)
    }

    /// Parses and analyzes a registration.
    fn prepare(&self, query: MonitorQuery, hash: u64) -> Result<CachedQuery, UpdateError> {
        let parsed = self
            .parse_text(&query.query)
            .and_then(|expr| {
                let highlight = query
                    .highlight
                    .as_deref()
                    .map(|text| self.parse_text(text))
                    .transpose()?;
                Ok((expr, highlight))
            });
        let (expr, highlight) = match parsed {
            Ok(parsed) => parsed,
            Err(error) => {
                return Err(UpdateError {
                    query_id: query.id,
                    error,
                });
            }
        };

        let disjuncts = self
            .decomposer
            .decompose(&expr)
            .into_iter()
            .map(Arc::new)
            .collect();
        Ok(CachedQuery {
            query,
            hash,
            disjuncts,
            highlight: highlight.map(Arc::new),
        })
    }

    /// Parses and analyzes query text. Empty queries are rejected.
    fn parse_text(&self, text: &str) -> Result<QueryExpr, QueryError> {
        let expr = parse(text, &self.parse_options)?
            .ok_or_else(|| QueryError::invalid("empty query").with_query(text))?;
        Ok(analyze_query(&expr, &self.analyzer))
    }

    /// Replaces the indexed disjuncts of a query. Takes effect on the next commit.
    fn index_query(&mut self, cached: &CachedQuery) -> Result<(), MonitorError> {
        self.index.delete(&cached.query.id);
        for (position, disjunct) in cached.disjuncts.iter().enumerate() {
            let tree = self.presearcher.build_tree(disjunct);
            let terms = self.presearcher.index_query(&tree, &cached.query.metadata);
            self.index
                .add_disjunct(&cached.query, cached.hash, position, &terms)?;
        }
        Ok(())
    }

    /// Commits the presearch index and refreshes the indexed terms.
    fn commit(&mut self) -> Result<(), MonitorError> {
        self.index.commit()?;
        self.indexed_terms = self.index.indexed_terms()?;
        self.last_update = Some(SystemTime::now());
        debug!(terms = self.indexed_terms.len(), "presearch index committed");
        Ok(())
    }

    /// Restores stored queries into the cache.
    ///
    /// If the stored settings hash differs from `settings` (or either is unknown), every
    /// stored query is re-indexed with the current presearcher.
    fn restore(&mut self, settings: Option<&str>) -> Result<(), MonitorError> {
        let stored = self.index.stored_queries()?;
        for entry in stored {
            let id = entry.query.id.clone();
            let cached = self
                .prepare(entry.query, entry.hash)
                .map_err(|e| MonitorError::CorruptQuery {
                    id,
                    message: e.error.message().to_string(),
                })?;
            self.queries.insert(cached.query.id.clone(), cached);
        }

        let Some(dir) = self.index.path().map(Path::to_path_buf) else {
            self.indexed_terms = self.index.indexed_terms()?;
            return Ok(());
        };

        let current = settings.is_some() && read_settings_hash(&dir).as_deref() == settings;
        if current || self.queries.is_empty() {
            self.indexed_terms = self.index.indexed_terms()?;
        } else {
            info!(queries = self.queries.len(), "presearch settings changed, re-indexing");
            self.index.delete_all()?;
            let queries: Vec<CachedQuery> = self.queries.values().cloned().collect();
            for cached in &queries {
                self.index_query(cached)?;
            }
            self.commit()?;
        }

        if let Some(settings) = settings {
            write_settings_hash(&dir, settings)?;
        }
        info!(queries = self.queries.len(), path = %dir.display(), "monitor opened");
        Ok(())
    }
}
