//! Candidate evaluation strategies.
//!
//! - [`MatchStrategy::Serial`] evaluates candidates in order on the calling thread.
//! - [`MatchStrategy::Parallel`] streams candidates through a bounded queue to worker
//!   threads; each worker is stopped by its own end marker.
//! - [`MatchStrategy::Partition`] splits candidates into contiguous partitions evaluated on
//!   a thread pool and joined.
//!
//! Every worker owns its matcher and results; results are merged once the workers finish.

use std::{
    fmt,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::bounded;
use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};
use sift_config::{MatchStrategy as StrategyKind, MatchingSettings};
use sift_query::QueryExpr;
use tracing::{debug, warn};

use crate::{
    MatchError, MonitorError,
    document::DocumentIndex,
    matcher::{CandidateMatcher, MatchOf, MatcherFactory},
    matches::{MatchBatch, SlowQuery},
};

/// One candidate query to evaluate.
#[derive(Debug, Clone)]
pub struct MatchTask {
    /// Query id.
    pub query_id: String,
    /// Analyzed match expression.
    pub query: Arc<QueryExpr>,
    /// Analyzed highlight expression.
    pub highlight: Option<Arc<QueryExpr>>,
}

/// Message sent to parallel workers.
enum Job {
    /// Evaluate a candidate.
    Task(MatchTask),
    /// No more candidates for this worker.
    End,
}

/// How candidates are evaluated.
pub enum MatchStrategy {
    /// Sequentially on the calling thread.
    Serial,
    /// Streamed to worker threads through a bounded queue.
    Parallel {
        /// Number of workers.
        threads: usize,
        /// Queue capacity.
        queue_size: usize,
    },
    /// Split into partitions evaluated on a thread pool.
    Partition {
        /// Number of partitions.
        threads: usize,
        /// Pool running the partitions.
        pool: ThreadPool,
    },
}

impl fmt::Debug for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => write!(f, "Serial"),
            Self::Parallel {
                threads,
                queue_size,
            } => f
                .debug_struct("Parallel")
                .field("threads", threads)
                .field("queue_size", queue_size)
                .finish(),
            Self::Partition { threads, .. } => f
                .debug_struct("Partition")
                .field("threads", threads)
                .finish_non_exhaustive(),
        }
    }
}

impl MatchStrategy {
    /// Creates a parallel strategy. Zero sizes are raised to one.
    pub fn parallel(threads: usize, queue_size: usize) -> Self {
        Self::Parallel {
            threads: threads.max(1),
            queue_size: queue_size.max(1),
        }
    }

    /// Creates a partition strategy with its thread pool.
    pub fn partition(threads: usize) -> Result<Self, MonitorError> {
        let threads = threads.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("sift-match-{i}"))
            .build()
            .map_err(|e| MonitorError::WorkerPool(e.to_string()))?;
        Ok(Self::Partition { threads, pool })
    }

    /// Creates the strategy described by the matching settings.
    pub fn from_settings(settings: &MatchingSettings) -> Result<Self, MonitorError> {
        match settings.strategy {
            StrategyKind::Serial => Ok(Self::Serial),
            StrategyKind::Parallel => Ok(Self::parallel(settings.threads, settings.queue_size)),
            StrategyKind::Partition => Self::partition(settings.threads),
        }
    }

    /// Evaluates candidates against a document.
    pub(crate) fn run<F: MatcherFactory>(
        &self,
        factory: &F,
        document: &Arc<DocumentIndex>,
        tasks: Vec<MatchTask>,
        slow_threshold: Duration,
    ) -> Result<MatchBatch<MatchOf<F>>, MonitorError> {
        debug!(strategy = ?self, candidates = tasks.len(), "evaluating candidates");
        match self {
            Self::Serial => Ok(run_serial(factory, document, &tasks, slow_threshold)),
            Self::Parallel {
                threads,
                queue_size,
            } => run_parallel(factory, document, tasks, *threads, *queue_size, slow_threshold),
            Self::Partition { threads, pool } => Ok(run_partition(
                pool,
                factory,
                document,
                &tasks,
                *threads,
                slow_threshold,
            )),
        }
    }
}

/// Evaluates one candidate, recording its outcome in `batch`.
fn evaluate<C: CandidateMatcher>(
    matcher: &mut C,
    task: &MatchTask,
    slow_threshold: Duration,
    batch: &mut MatchBatch<C::Match>,
) {
    let start = Instant::now();
    let result = matcher.match_query(
        &task.query_id,
        &task.query,
        task.highlight.as_deref(),
    );
    let elapsed = start.elapsed();
    batch.queries_run += 1;

    if elapsed > slow_threshold {
        debug!(query_id = %task.query_id, ?elapsed, "slow query");
        batch.slow_log.push(SlowQuery {
            query_id: task.query_id.clone(),
            duration: elapsed,
        });
    }

    match result {
        Ok(Some(found)) => batch.add(matcher, &task.query_id, found),
        Ok(None) => {}
        Err(err) => {
            warn!(query_id = %task.query_id, error = %err, "query evaluation failed");
            batch
                .errors
                .push(MatchError::new(task.query_id.clone(), err.to_string()));
        }
    }
}

/// Evaluates all candidates with one matcher.
fn run_serial<F: MatcherFactory>(
    factory: &F,
    document: &Arc<DocumentIndex>,
    tasks: &[MatchTask],
    slow_threshold: Duration,
) -> MatchBatch<MatchOf<F>> {
    let mut matcher = factory.create(document);
    let mut batch = MatchBatch::default();
    for task in tasks {
        evaluate(&mut matcher, task, slow_threshold, &mut batch);
    }
    batch
}

/// Streams candidates to `threads` workers through a queue of `queue_size`.
fn run_parallel<F: MatcherFactory>(
    factory: &F,
    document: &Arc<DocumentIndex>,
    tasks: Vec<MatchTask>,
    threads: usize,
    queue_size: usize,
    slow_threshold: Duration,
) -> Result<MatchBatch<MatchOf<F>>, MonitorError> {
    let (sender, receiver) = bounded::<Job>(queue_size);

    let results = thread::scope(|scope| {
        let workers: Vec<_> = (0..threads)
            .map(|_| {
                let receiver = receiver.clone();
                scope.spawn(move || {
                    let mut matcher = factory.create(document);
                    let mut batch = MatchBatch::default();
                    while let Ok(Job::Task(task)) = receiver.recv() {
                        evaluate(&mut matcher, &task, slow_threshold, &mut batch);
                    }
                    (matcher, batch)
                })
            })
            .collect();
        drop(receiver);

        let jobs = tasks
            .into_iter()
            .map(Job::Task)
            .chain((0..threads).map(|_| Job::End));
        for job in jobs {
            if sender.send(job).is_err() {
                break;
            }
        }
        drop(sender);

        workers
            .into_iter()
            .map(|worker| worker.join().map_err(|_| MonitorError::WorkerPanicked))
            .collect::<Result<Vec<_>, _>>()
    })?;

    Ok(merge(results))
}

/// Splits candidates into `threads` contiguous partitions evaluated on `pool`.
fn run_partition<F: MatcherFactory>(
    pool: &ThreadPool,
    factory: &F,
    document: &Arc<DocumentIndex>,
    tasks: &[MatchTask],
    threads: usize,
    slow_threshold: Duration,
) -> MatchBatch<MatchOf<F>> {
    if tasks.is_empty() {
        return MatchBatch::default();
    }
    let partition_size = tasks.len().div_ceil(threads);

    let results: Vec<_> = pool.install(|| {
        tasks
            .par_chunks(partition_size)
            .map(|partition| {
                let mut matcher = factory.create(document);
                let mut batch = MatchBatch::default();
                for task in partition {
                    evaluate(&mut matcher, task, slow_threshold, &mut batch);
                }
                (matcher, batch)
            })
            .collect()
    });

    merge(results)
}

/// Merges worker results, resolving matches reported by several workers.
fn merge<C: CandidateMatcher>(results: Vec<(C, MatchBatch<C::Match>)>) -> MatchBatch<C::Match> {
    let mut results = results.into_iter();
    let Some((matcher, mut merged)) = results.next() else {
        return MatchBatch::default();
    };
    for (_, batch) in results {
        merged.merge(&matcher, batch);
    }
    merged
}
