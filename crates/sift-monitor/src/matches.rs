//! Match results.

use std::{collections::BTreeMap, time::Duration};

use serde::Serialize;

use crate::{MatchError, matcher::CandidateMatcher};

/// A candidate evaluation that exceeded the slow-log threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlowQuery {
    /// Id of the slow query.
    pub query_id: String,
    /// Time spent evaluating it.
    pub duration: Duration,
}

/// Time spent in each phase of a match call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchTimings {
    /// Indexing the document and selecting candidates.
    pub presearch: Duration,
    /// Evaluating candidates.
    pub matching: Duration,
}

/// Results of matching one document.
#[derive(Debug, Clone, Serialize)]
pub struct Matches<M> {
    /// Id of the matched document.
    pub document_id: String,
    /// Matches by query id.
    pub matches: BTreeMap<String, M>,
    /// Number of presearch documents (query disjuncts) selected as candidates.
    pub presearcher_hits: usize,
    /// Number of candidate evaluations run.
    pub queries_run: usize,
    /// Candidates whose evaluation failed.
    pub errors: Vec<MatchError>,
    /// Candidates that exceeded the slow-log threshold.
    pub slow_log: Vec<SlowQuery>,
    /// Phase timings.
    pub timings: MatchTimings,
}

impl<M> Matches<M> {
    /// Returns the match of a query.
    pub fn get(&self, query_id: &str) -> Option<&M> {
        self.matches.get(query_id)
    }

    /// Returns true if the query matched.
    pub fn contains(&self, query_id: &str) -> bool {
        self.matches.contains_key(query_id)
    }

    /// Returns the ids of matching queries, sorted.
    pub fn query_ids(&self) -> impl Iterator<Item = &str> {
        self.matches.keys().map(String::as_str)
    }

    /// Number of matching queries.
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Returns true if no query matched.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Results accumulated by one worker.
#[derive(Debug)]
pub(crate) struct MatchBatch<M> {
    /// Matches by query id.
    pub(crate) matches: BTreeMap<String, M>,
    /// Candidate evaluations run.
    pub(crate) queries_run: usize,
    /// Failed evaluations.
    pub(crate) errors: Vec<MatchError>,
    /// Slow evaluations.
    pub(crate) slow_log: Vec<SlowQuery>,
}

impl<M> Default for MatchBatch<M> {
    fn default() -> Self {
        Self {
            matches: BTreeMap::new(),
            queries_run: 0,
            errors: Vec::new(),
            slow_log: Vec::new(),
        }
    }
}

impl<M> MatchBatch<M> {
    /// Adds a match, resolving it against an earlier match of the same query.
    pub(crate) fn add<C>(&mut self, matcher: &C, query_id: &str, found: M)
    where
        C: CandidateMatcher<Match = M>,
    {
        let resolved = match self.matches.remove(query_id) {
            Some(existing) => matcher.resolve(existing, found),
            None => found,
        };
        self.matches.insert(query_id.to_string(), resolved);
    }

    /// Merges another worker's results into this one.
    pub(crate) fn merge<C>(&mut self, matcher: &C, other: Self)
    where
        C: CandidateMatcher<Match = M>,
    {
        for (query_id, found) in other.matches {
            self.add(matcher, &query_id, found);
        }
        self.queries_run += other.queries_run;
        self.errors.extend(other.errors);
        self.slow_log.extend(other.slow_log);
    }
}
