//! End-to-end monitor tests: registration, candidate selection, matching and persistence.

#![allow(clippy::tests_outside_test_module)]

use std::fs;

use sift_config::{Config, PresearcherKind};
use sift_monitor::{
    HighlightingMatcher, InputDocument, MatchStrategy, Monitor, MonitorQuery, SETTINGS_HASH_FILE,
    ScoringMatcher, SimpleMatcher, settings_hash,
};

fn config_with_field(field: &str) -> Config {
    let mut config = Config::default();
    config.monitor.default_field = field.into();
    config
}

fn doc(text: &str) -> InputDocument {
    InputDocument::new("doc").with_field("text", text)
}

fn matched_ids(monitor: &Monitor, document: &InputDocument) -> Vec<String> {
    let matches = monitor.match_document(document, &SimpleMatcher::new).unwrap();
    matches.query_ids().map(str::to_string).collect()
}

#[test]
fn only_candidates_are_run() {
    let mut config = config_with_field("f");
    config.monitor.stemmer = "none".into();
    config.weights.terms.insert("goodbye".into(), 0.5);
    let mut monitor = Monitor::new(&config).unwrap();
    let result = monitor
        .update([
            MonitorQuery::new("1", "cheese"),
            MonitorQuery::new("2", "sesquipedalian"),
            MonitorQuery::new("3", "+goodbye +world"),
            MonitorQuery::new("4", "text"),
        ])
        .unwrap();
    assert_eq!(result.indexed, 4);
    assert!(result.is_ok());

    let document = InputDocument::new("d").with_field("f", "some text about the world");
    assert_eq!(monitor.presearcher_candidates(&document).unwrap(), vec!["3", "4"]);

    let matches = monitor.match_document(&document, &SimpleMatcher::new).unwrap();
    assert_eq!(matches.document_id, "d");
    assert_eq!(matches.presearcher_hits, 2);
    assert_eq!(matches.queries_run, 2);
    assert_eq!(matches.query_ids().collect::<Vec<_>>(), vec!["4"]);
    assert!(matches.errors.is_empty());
}

#[test]
fn disjunctions_match_on_either_term() {
    let mut monitor = Monitor::new(&Config::default()).unwrap();
    monitor
        .update([
            MonitorQuery::new("or", "term1 term2"),
            MonitorQuery::new("and", "+term1 +term2"),
        ])
        .unwrap();
    assert_eq!(monitor.disjunct_count(), 3);

    assert_eq!(matched_ids(&monitor, &doc("only term1 here")), vec!["or"]);
    assert_eq!(matched_ids(&monitor, &doc("only term2 here")), vec!["or"]);
    assert_eq!(matched_ids(&monitor, &doc("term1 and term2")), vec!["and", "or"]);
    assert!(monitor.presearcher_candidates(&doc("neither")).unwrap().is_empty());

    let both = monitor
        .match_document(&doc("term1 term2"), &SimpleMatcher::new)
        .unwrap();
    assert_eq!(both.len(), 2);
    assert_eq!(both.queries_run, 3);
}

#[test]
fn nested_disjunction_selects_on_rarest_clause() {
    let mut monitor = Monitor::new(&Config::default()).unwrap();
    monitor
        .update([MonitorQuery::new("q", "+foo +bar +(badger cormorant)")])
        .unwrap();

    assert_eq!(matched_ids(&monitor, &doc("foo bar badger")), vec!["q"]);
    assert!(monitor.presearcher_candidates(&doc("foo bar")).unwrap().is_empty());

    let partial = monitor
        .match_document(&doc("cormorant"), &SimpleMatcher::new)
        .unwrap();
    assert_eq!(partial.presearcher_hits, 1);
    assert!(partial.is_empty());
}

#[test]
fn invalid_queries_are_reported_and_skipped() {
    let mut monitor = Monitor::new(&Config::default()).unwrap();
    let result = monitor
        .update([
            MonitorQuery::new("1", "alpha"),
            MonitorQuery::new("2", "beta"),
            MonitorQuery::new("3", "(foo bar"),
            MonitorQuery::new("4", "gamma"),
            MonitorQuery::new("5", "delta"),
        ])
        .unwrap();

    assert_eq!(result.indexed, 4);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].query_id, "3");
    assert_eq!(monitor.query_count(), 4);
    assert!(monitor.query("3").is_none());
}

#[test]
fn rejected_update_keeps_previous_registration() {
    let mut monitor = Monitor::new(&Config::default()).unwrap();
    monitor.update([MonitorQuery::new("q", "alpha")]).unwrap();
    let result = monitor.update([MonitorQuery::new("q", "foo AND")]).unwrap();

    assert_eq!(result.errors.len(), 1);
    assert_eq!(monitor.query("q").unwrap().query, "alpha");
    assert_eq!(matched_ids(&monitor, &doc("alpha")), vec!["q"]);
}

#[test]
fn empty_query_is_rejected() {
    let mut monitor = Monitor::new(&Config::default()).unwrap();
    let result = monitor.update([MonitorQuery::new("q", "   ")]).unwrap();
    assert_eq!(result.errors.len(), 1);
    assert_eq!(monitor.query_count(), 0);
}

#[test]
fn reregistration_replaces_query() {
    let mut monitor = Monitor::new(&Config::default()).unwrap();
    monitor.update([MonitorQuery::new("q", "alpha")]).unwrap();
    monitor.update([MonitorQuery::new("q", "beta")]).unwrap();

    assert_eq!(monitor.query_count(), 1);
    assert!(matched_ids(&monitor, &doc("alpha")).is_empty());
    assert_eq!(matched_ids(&monitor, &doc("beta")), vec!["q"]);
}

#[test]
fn unchanged_queries_are_skipped() {
    let mut monitor = Monitor::new(&Config::default()).unwrap();
    let queries = [MonitorQuery::new("a", "alpha"), MonitorQuery::new("b", "beta")];
    monitor.update(queries.clone()).unwrap();
    let again = monitor.update(queries).unwrap();
    assert_eq!(again.indexed, 0);
    assert_eq!(again.unchanged, 2);
}

#[test]
fn strategies_agree() {
    let queries: Vec<MonitorQuery> = (0..30)
        .map(|i| MonitorQuery::new(format!("q{i:02}"), format!("common term{}", i % 3)))
        .collect();
    let document = doc("common term1 other");

    let mut results = Vec::new();
    for strategy in [
        MatchStrategy::Serial,
        MatchStrategy::parallel(3, 4),
        MatchStrategy::partition(3).unwrap(),
    ] {
        let mut monitor = Monitor::builder(Config::default())
            .strategy(strategy)
            .build()
            .unwrap();
        monitor.update(queries.clone()).unwrap();
        let matches = monitor
            .match_document(&document, &ScoringMatcher::new)
            .unwrap();
        assert_eq!(matches.queries_run, 40);
        results.push(matches.query_ids().map(str::to_string).collect::<Vec<_>>());
    }

    assert_eq!(results[0].len(), 30);
    assert_eq!(results[0], results[1]);
    assert_eq!(results[0], results[2]);
}

#[test]
fn multipass_requires_every_pass() {
    let mut config = Config::default();
    config.presearcher.kind = PresearcherKind::Multipass;
    config.presearcher.passes = 3;
    let mut monitor = Monitor::new(&config).unwrap();
    monitor
        .update([MonitorQuery::new("q", "+alpha +beta +gamma")])
        .unwrap();

    assert_eq!(matched_ids(&monitor, &doc("gamma beta alpha")), vec!["q"]);
    assert!(monitor.presearcher_candidates(&doc("alpha beta")).unwrap().is_empty());
    assert!(monitor.presearcher_candidates(&doc("beta gamma")).unwrap().is_empty());
}

#[test]
fn unfilterable_queries_are_always_candidates() {
    let mut monitor = Monitor::new(&Config::default()).unwrap();
    monitor
        .update([
            MonitorQuery::new("range", "text:[a TO c]"),
            MonitorQuery::new("fuzzy", "roam~1"),
        ])
        .unwrap();

    let matches = monitor
        .match_document(&doc("foam zebra"), &SimpleMatcher::new)
        .unwrap();
    assert_eq!(matches.queries_run, 2);
    assert_eq!(matches.query_ids().collect::<Vec<_>>(), vec!["fuzzy"]);
}

#[test]
fn negative_only_queries_are_candidates() {
    let mut monitor = Monitor::new(&Config::default()).unwrap();
    let update = monitor
        .update([
            MonitorQuery::new("neg", "-alpha"),
            MonitorQuery::new("nested", "delta (-alpha)"),
        ])
        .unwrap();
    assert!(update.is_ok());
    assert_eq!(monitor.disjunct_count(), 3);

    assert_eq!(matched_ids(&monitor, &doc("beta gamma")), vec!["neg", "nested"]);
    assert!(matched_ids(&monitor, &doc("alpha beta")).is_empty());
    assert_eq!(matched_ids(&monitor, &doc("alpha delta")), vec!["nested"]);
}

#[test]
fn filter_field_restricts_by_metadata() {
    let mut config = Config::default();
    config.presearcher.filter_field = "language".into();
    let mut monitor = Monitor::new(&config).unwrap();
    monitor
        .update([
            MonitorQuery::new("en", "hello").with_metadata("language", "en"),
            MonitorQuery::new("de", "hello").with_metadata("language", "de"),
            MonitorQuery::new("any", "hello"),
        ])
        .unwrap();

    let german = doc("hello").with_field("language", "de");
    assert_eq!(matched_ids(&monitor, &german), vec!["any", "de"]);

    let unlabelled = doc("hello");
    assert_eq!(matched_ids(&monitor, &unlabelled), vec!["any", "de", "en"]);
}

#[test]
fn highlights_use_highlight_query() {
    let mut monitor = Monitor::new(&Config::default()).unwrap();
    monitor
        .update([
            MonitorQuery::new("plain", "world"),
            MonitorQuery::new("custom", "+hello +world").with_highlight("hello"),
        ])
        .unwrap();

    let matches = monitor
        .match_document(&doc("hello big world"), &HighlightingMatcher::new)
        .unwrap();
    assert_eq!(matches.get("plain").unwrap().ranges("text"), vec![10..15]);
    assert_eq!(matches.get("custom").unwrap().ranges("text"), vec![0..5]);
}

#[test]
fn delete_and_clear() {
    let mut monitor = Monitor::new(&Config::default()).unwrap();
    monitor
        .update([
            MonitorQuery::new("a", "alpha"),
            MonitorQuery::new("b", "alpha beta"),
            MonitorQuery::new("c", "gamma"),
        ])
        .unwrap();

    monitor.delete(["a", "missing"]).unwrap();
    assert_eq!(monitor.query_ids().collect::<Vec<_>>(), vec!["b", "c"]);
    assert_eq!(matched_ids(&monitor, &doc("alpha")), vec!["b"]);

    monitor.clear().unwrap();
    assert_eq!(monitor.stats().queries, 0);
    assert!(monitor.presearcher_candidates(&doc("alpha gamma")).unwrap().is_empty());
}

#[test]
fn slow_log_records_evaluations_over_threshold() {
    let mut monitor = Monitor::new(&Config::default()).unwrap();
    monitor.update([MonitorQuery::new("q", "alpha")]).unwrap();
    monitor.set_slow_log_threshold(std::time::Duration::ZERO);

    let matches = monitor.match_document(&doc("alpha"), &SimpleMatcher::new).unwrap();
    assert_eq!(matches.slow_log.len(), 1);
    assert_eq!(matches.slow_log[0].query_id, "q");
}

#[test]
fn stats_track_updates() {
    let mut monitor = Monitor::new(&Config::default()).unwrap();
    assert!(monitor.stats().last_update.is_none());
    monitor
        .update([MonitorQuery::new("q", "alpha beta"), MonitorQuery::new("r", "gamma")])
        .unwrap();

    let stats = monitor.stats();
    assert_eq!(stats.queries, 2);
    assert_eq!(stats.disjuncts, 3);
    assert!(stats.last_update.is_some());
}

mod persistence {
    use super::*;

    #[test]
    fn reopened_monitor_restores_queries() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        {
            let mut monitor = Monitor::open(dir.path(), &config).unwrap();
            monitor
                .update([
                    MonitorQuery::new("a", "alpha").with_metadata("owner", "x"),
                    MonitorQuery::new("b", "+beta +gamma").with_highlight("beta"),
                ])
                .unwrap();
        }

        let stored = fs::read_to_string(dir.path().join(SETTINGS_HASH_FILE)).unwrap();
        assert_eq!(stored.trim(), settings_hash(&config));

        let mut monitor = Monitor::open(dir.path(), &config).unwrap();
        assert_eq!(monitor.query_count(), 2);
        assert_eq!(monitor.query("a").unwrap().metadata["owner"], "x");
        assert_eq!(monitor.query("b").unwrap().highlight.as_deref(), Some("beta"));
        assert_eq!(matched_ids(&monitor, &doc("beta gamma alpha")), vec!["a", "b"]);

        let again = monitor
            .update([
                MonitorQuery::new("a", "alpha").with_metadata("owner", "x"),
                MonitorQuery::new("b", "+beta +gamma").with_highlight("beta"),
            ])
            .unwrap();
        assert_eq!(again.unchanged, 2);
    }

    #[test]
    fn changed_settings_reindex_stored_queries() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut monitor = Monitor::open(dir.path(), &Config::default()).unwrap();
            monitor
                .update([MonitorQuery::new("q", "+alpha +beta +gamma")])
                .unwrap();
        }

        let mut config = Config::default();
        config.presearcher.kind = PresearcherKind::Multipass;
        config.presearcher.passes = 3;
        let monitor = Monitor::open(dir.path(), &config).unwrap();

        assert_eq!(monitor.query_count(), 1);
        assert_eq!(matched_ids(&monitor, &doc("alpha beta gamma")), vec!["q"]);
        assert!(monitor.presearcher_candidates(&doc("alpha beta")).unwrap().is_empty());
    }
}

mod resolve {
    use std::{fmt::Debug, sync::Arc};

    use sift_monitor::{CandidateMatcher, DocumentIndex, ExplainingMatcher, build_analyzer};
    use sift_query::{ParseOptions, parse};

    use super::*;

    fn assert_idempotent<M>(mut matcher: M)
    where
        M: CandidateMatcher,
        M::Match: PartialEq + Debug,
    {
        let query = parse("hello world", &ParseOptions::new("text")).unwrap().unwrap();
        let found = matcher.match_query("q", &query, None).unwrap().unwrap();
        assert_eq!(matcher.resolve(found.clone(), found.clone()), found);
    }

    #[test]
    fn resolving_a_match_with_itself_is_identity() {
        let document = InputDocument::new("d").with_field("text", "hello big world");
        let index = Arc::new(DocumentIndex::build(&document, &build_analyzer(None)).unwrap());

        assert_idempotent(SimpleMatcher::new(&index));
        assert_idempotent(ScoringMatcher::new(&index));
        assert_idempotent(ExplainingMatcher::new(&index));
        assert_idempotent(HighlightingMatcher::new(&index));
    }
}
