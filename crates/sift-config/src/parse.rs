//! Configuration file parsing.
//!
//! Parses individual `sift.toml` files into intermediate `RawConfig` structures
//! that preserve the optional nature of all fields before merging.

use std::{collections::BTreeMap, fs, path::Path, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};

use crate::{CombineMode, ConfigError, MatchStrategy, PresearcherKind};

/// Raw configuration as parsed directly from a TOML file.
///
/// All fields are optional to support partial configs that will be merged.
/// This mirrors the TOML schema exactly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// When true, stop discovery here - ignore parent and global configs.
    pub root: Option<bool>,
    /// Monitor section.
    pub monitor: Option<RawMonitorSettings>,
    /// Presearcher section.
    pub presearcher: Option<RawPresearcherSettings>,
    /// Term weighting section.
    pub weights: Option<RawWeightSettings>,
    /// Match strategy section.
    pub matching: Option<RawMatchingSettings>,
}

/// Raw monitor settings.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMonitorSettings {
    /// Candidate evaluations slower than this are recorded in the slow log.
    #[serde(rename = "slow_log_threshold_ms")]
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    pub slow_log_threshold: Option<Duration>,
    /// Queries indexed between commits.
    pub commit_batch_size: Option<usize>,
    /// Field used for query terms without an explicit field.
    pub default_field: Option<String>,
    /// Stemming language, or `none`.
    pub stemmer: Option<String>,
}

/// Raw presearcher settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPresearcherSettings {
    /// Presearcher variant.
    pub kind: Option<PresearcherKind>,
    /// Number of passes for the multipass presearcher.
    pub passes: Option<usize>,
    /// Subtrees weighing more than this may be skipped by later passes.
    pub min_weight: Option<f32>,
    /// Metadata field restricting queries to documents carrying the same value.
    pub filter_field: Option<String>,
    /// Whether wildcard-like queries are filtered on n-grams.
    pub wildcard_ngrams: Option<bool>,
    /// Suffix appended to n-gram tokens.
    pub ngram_suffix: Option<String>,
    /// Token standing in for over-long document tokens.
    pub wildcard_token: Option<String>,
    /// Longest document token expanded into n-grams.
    pub max_token_size: Option<usize>,
}

/// Raw weight settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawWeightSettings {
    /// Factor applied to terms that cannot be filtered.
    pub any_factor: Option<f32>,
    /// Scale of the token length norm.
    pub length_a: Option<f32>,
    /// Decay of the token length norm.
    pub length_k: Option<f32>,
    /// Disjunction combine policy.
    pub combine: Option<CombineMode>,
    /// Per-field factors.
    pub fields: Option<BTreeMap<String, f32>>,
    /// Per-term factors.
    pub terms: Option<BTreeMap<String, f32>>,
    /// Term frequencies used as the base weight.
    pub frequencies: Option<BTreeMap<String, u64>>,
    /// Scale of the inverse term frequency.
    pub frequency_n: Option<f32>,
    /// Minimum frequency-derived weight.
    pub frequency_k: Option<f32>,
}

/// Raw matching settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMatchingSettings {
    /// Candidate evaluation strategy.
    pub strategy: Option<MatchStrategy>,
    /// Worker threads for the parallel strategies.
    pub threads: Option<usize>,
    /// Capacity of the task queue used by the parallel strategy.
    pub queue_size: Option<usize>,
}

/// Parses a configuration file from disk.
///
/// Returns a `RawConfig` with all fields as optionals, ready for merging.
pub fn parse_config_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config_str(&contents, path)
}

/// Parses configuration from a TOML string.
///
/// The `path` parameter is used for error reporting.
pub fn parse_config_str(contents: &str, path: &Path) -> Result<RawConfig, ConfigError> {
    toml::from_str(contents).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Checks if a config file has `root = true` set.
///
/// This is used during discovery to stop traversal at root configs.
/// Returns false if the file cannot be read or parsed.
pub fn is_root_config(path: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(path) else {
        return false;
    };
    let Ok(config) = toml::from_str::<RawConfig>(&contents) else {
        return false;
    };
    config.root == Some(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> RawConfig {
        parse_config_str(toml, Path::new("sift.toml")).unwrap()
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse("");
        assert!(config.root.is_none());
        assert!(config.monitor.is_none());
        assert!(config.presearcher.is_none());
        assert!(config.weights.is_none());
        assert!(config.matching.is_none());
    }

    #[test]
    fn test_parse_monitor_settings() {
        let config = parse(
            r#"
[monitor]
slow_log_threshold_ms = 15
commit_batch_size = 100
default_field = "body"
stemmer = "none"
"#,
        );
        let monitor = config.monitor.unwrap();
        assert_eq!(monitor.slow_log_threshold, Some(Duration::from_millis(15)));
        assert_eq!(monitor.commit_batch_size, Some(100));
        assert_eq!(monitor.default_field.as_deref(), Some("body"));
        assert_eq!(monitor.stemmer.as_deref(), Some("none"));
    }

    #[test]
    fn test_parse_partial_presearcher() {
        let config = parse(
            r#"
[presearcher]
kind = "multipass"
passes = 3
"#,
        );
        let presearcher = config.presearcher.unwrap();
        assert_eq!(presearcher.kind, Some(PresearcherKind::Multipass));
        assert_eq!(presearcher.passes, Some(3));
        assert!(presearcher.min_weight.is_none());
        assert!(presearcher.filter_field.is_none());
    }

    #[test]
    fn test_parse_weight_tables() {
        let config = parse(
            r#"
[weights]
combine = "product"

[weights.fields]
title = 2.0

[weights.terms]
the = 0.1

[weights.frequencies]
common = 1000
"#,
        );
        let weights = config.weights.unwrap();
        assert_eq!(weights.combine, Some(CombineMode::Product));
        assert_eq!(weights.fields.unwrap().get("title"), Some(&2.0));
        assert_eq!(weights.terms.unwrap().get("the"), Some(&0.1));
        assert_eq!(weights.frequencies.unwrap().get("common"), Some(&1000));
    }

    #[test]
    fn test_parse_matching_strategy() {
        let config = parse(
            r#"
[matching]
strategy = "partition"
threads = 8
"#,
        );
        let matching = config.matching.unwrap();
        assert_eq!(matching.strategy, Some(MatchStrategy::Partition));
        assert_eq!(matching.threads, Some(8));
        assert!(matching.queue_size.is_none());
    }

    #[test]
    fn test_parse_unknown_strategy_fails() {
        let result = parse_config_str("[matching]\nstrategy = \"fastest\"\n", Path::new("x.toml"));
        assert!(matches!(result, Err(ConfigError::ParseToml { .. })));
    }

    #[test]
    fn test_parse_invalid_toml() {
        let err = parse_config_str("[monitor\n", Path::new("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_is_root_config() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root.toml");
        let plain = dir.path().join("plain.toml");
        fs::write(&root, "root = true\n").unwrap();
        fs::write(&plain, "[monitor]\nstemmer = \"german\"\n").unwrap();

        assert!(is_root_config(&root));
        assert!(!is_root_config(&plain));
        assert!(!is_root_config(&dir.path().join("missing.toml")));
    }
}
