//! Implementation of `sift match`.

use std::{fs, path::Path, process::ExitCode};

use serde::{Serialize, de::DeserializeOwned};
use sift_monitor::{
    ExplainingMatcher, HighlightingMatcher, InputDocument, MatchOf, MatcherFactory, Monitor,
    MonitorQuery, ScoringMatcher, SimpleMatcher, UpdateResult,
};
use tracing::debug;

use crate::cli::{
    args::{MatchCommand, MatcherKind},
    context::CommandContext,
    output::{RenderMatch, output_matches},
};

/// Registers the queries and matches the document against them.
pub fn run(ctx: &CommandContext, cmd: &MatchCommand) -> ExitCode {
    let queries: Vec<MonitorQuery> = match read_json(&cmd.queries) {
        Ok(queries) => queries,
        Err(code) => return code,
    };
    let document: InputDocument = match read_json(&cmd.document) {
        Ok(document) => document,
        Err(code) => return code,
    };

    debug!(queries = queries.len(), document = %document.id, "read match inputs");

    let opened = match &cmd.index {
        Some(path) => Monitor::open(path, &ctx.config),
        None => Monitor::new(&ctx.config),
    };
    let mut monitor = match opened {
        Ok(monitor) => monitor,
        Err(e) => {
            eprintln!("error: failed to open monitor: {e}");
            return ExitCode::FAILURE;
        }
    };
    let update = match monitor.update(queries) {
        Ok(update) => update,
        Err(e) => {
            eprintln!("error: failed to register queries: {e}");
            return ExitCode::FAILURE;
        }
    };

    let run = Run {
        monitor: &monitor,
        update: &update,
        document: &document,
        json: cmd.json,
    };
    match cmd.matcher {
        MatcherKind::Simple => run.with(&SimpleMatcher::new),
        MatcherKind::Scoring => run.with(&ScoringMatcher::new),
        MatcherKind::Explain => run.with(&ExplainingMatcher::new),
        MatcherKind::Highlight => run.with(&HighlightingMatcher::new),
    }
}

/// A prepared match run.
struct Run<'a> {
    /// Monitor with the queries registered.
    monitor: &'a Monitor,
    /// Registration outcome.
    update: &'a UpdateResult,
    /// Document to match.
    document: &'a InputDocument,
    /// Whether to print JSON.
    json: bool,
}

impl Run<'_> {
    /// Matches the document with the given matcher and prints the results.
    fn with<F>(&self, factory: &F) -> ExitCode
    where
        F: MatcherFactory,
        MatchOf<F>: RenderMatch + Serialize,
    {
        match self.monitor.match_document(self.document, factory) {
            Ok(matches) => output_matches(self.update, &matches, self.document, self.json),
            Err(e) => {
                eprintln!("error: failed to match document: {e}");
                ExitCode::FAILURE
            }
        }
    }
}

/// Reads and deserializes a JSON file, reporting failures on stderr.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ExitCode> {
    let text = fs::read_to_string(path).map_err(|e| {
        eprintln!("error: failed to read {}: {e}", path.display());
        ExitCode::FAILURE
    })?;
    serde_json::from_str(&text).map_err(|e| {
        eprintln!("error: invalid JSON in {}: {e}", path.display());
        ExitCode::FAILURE
    })
}
