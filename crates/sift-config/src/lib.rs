//! Configuration system for sift.
//!
//! sift uses TOML configuration files named `sift.toml`. Configuration is resolved by walking
//! up the directory tree from the current working directory, collecting any `sift.toml` files
//! found, then loading the user's global config with lowest precedence. A config with
//! `root = true` ends the walk.

#![warn(missing_docs)]

mod discovery;
mod error;
mod merge;
mod parse;
#[cfg(test)]
mod test_support;
mod validate;

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

pub use discovery::{CONFIG_FILENAME, discover_config_files, global_config_path, is_global_config};
pub use error::ConfigError;
pub use merge::{ParsedConfig, merge_configs};
pub use parse::{
    RawConfig, RawMatchingSettings, RawMonitorSettings, RawPresearcherSettings,
    RawWeightSettings, parse_config_file, parse_config_str,
};
use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};
pub use validate::{ConfigWarning, KNOWN_STEMMERS};
use validate::validate_config;

/// Top-level merged configuration for sift.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Monitor settings.
    pub monitor: MonitorSettings,
    /// Presearcher settings.
    pub presearcher: PresearcherSettings,
    /// Term weighting settings.
    pub weights: WeightSettings,
    /// Candidate evaluation settings.
    pub matching: MatchingSettings,
    /// Directory containing the most specific config file.
    #[serde(skip)]
    pub config_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration by discovering and merging all relevant `sift.toml` files.
    ///
    /// Returns `Ok(Config::default())` if no configuration files are found.
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        let config_files = discover_config_files(cwd);
        Self::load_from_files(&config_files)
    }

    /// Loads a single configuration file given explicitly, without discovery.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Self::load_from_files(&[path.to_path_buf()])
    }

    /// Loads configuration from a specific list of config file paths.
    ///
    /// Files should be provided in precedence order: highest precedence first.
    pub fn load_from_files(files: &[PathBuf]) -> Result<Self, ConfigError> {
        let parsed: Vec<ParsedConfig> = files
            .iter()
            .map(|path| {
                let config = parse_config_file(path)?;
                Ok(ParsedConfig {
                    path: path.clone(),
                    config,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(merge_configs(&parsed))
    }

    /// Validates the configuration and returns any warnings.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        validate_config(self)
    }

    /// Serializes the effective settings to TOML, in the same layout as a `sift.toml` file.
    pub fn settings_to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Which presearcher indexes registered queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PresearcherKind {
    /// One term set per query.
    #[default]
    Term,
    /// One term set per pass, each pass choosing different conjunction terms.
    Multipass,
}

/// How a disjunction combines the weights of its children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineMode {
    /// Minimum child weight.
    #[default]
    Min,
    /// Maximum child weight.
    Max,
    /// Product of child weights.
    Product,
}

/// How candidate queries are evaluated against a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// On the calling thread.
    #[default]
    Serial,
    /// Worker threads pulling from a bounded queue.
    Parallel,
    /// Worker threads each given a contiguous slice of the candidates.
    Partition,
}

/// Monitor settings.
#[serde_as]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Candidate evaluations slower than this are recorded in the slow log.
    #[serde(rename = "slow_log_threshold_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub slow_log_threshold: Duration,
    /// Queries indexed between commits.
    pub commit_batch_size: usize,
    /// Field used for query terms without an explicit field.
    pub default_field: String,
    /// Stemming language, or `none`.
    pub stemmer: String,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            slow_log_threshold: Duration::from_millis(2),
            commit_batch_size: 5000,
            default_field: String::from("text"),
            stemmer: String::from("english"),
        }
    }
}

/// Presearcher settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PresearcherSettings {
    /// Presearcher variant.
    pub kind: PresearcherKind,
    /// Number of passes for the multipass presearcher.
    pub passes: usize,
    /// Subtrees weighing more than this may be skipped by later passes.
    pub min_weight: f32,
    /// Metadata field restricting queries to documents carrying the same value. Empty disables.
    pub filter_field: String,
    /// Whether wildcard-like queries are filtered on n-grams.
    pub wildcard_ngrams: bool,
    /// Suffix appended to n-gram tokens.
    pub ngram_suffix: String,
    /// Token standing in for over-long document tokens.
    pub wildcard_token: String,
    /// Longest document token expanded into n-grams.
    pub max_token_size: usize,
}

impl Default for PresearcherSettings {
    fn default() -> Self {
        Self {
            kind: PresearcherKind::Term,
            passes: 2,
            min_weight: 0.0,
            filter_field: String::new(),
            wildcard_ngrams: false,
            ngram_suffix: String::from("XX"),
            wildcard_token: String::from("__WILDCARD__"),
            max_token_size: 30,
        }
    }
}

/// Term weighting settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WeightSettings {
    /// Factor applied to terms that cannot be filtered.
    pub any_factor: f32,
    /// Scale of the token length norm.
    pub length_a: f32,
    /// Decay of the token length norm.
    pub length_k: f32,
    /// Disjunction combine policy.
    pub combine: CombineMode,
    /// Scale of the inverse term frequency.
    pub frequency_n: f32,
    /// Minimum frequency-derived weight.
    pub frequency_k: f32,
    /// Per-field factors.
    pub fields: BTreeMap<String, f32>,
    /// Per-term factors.
    pub terms: BTreeMap<String, f32>,
    /// Term frequencies used as the base weight. Empty disables frequency weighting.
    pub frequencies: BTreeMap<String, u64>,
}

impl Default for WeightSettings {
    fn default() -> Self {
        Self {
            any_factor: 0.0,
            length_a: 3.0,
            length_k: 0.3,
            combine: CombineMode::Min,
            frequency_n: 1.0,
            frequency_k: 0.0,
            fields: BTreeMap::new(),
            terms: BTreeMap::new(),
            frequencies: BTreeMap::new(),
        }
    }
}

/// Candidate evaluation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MatchingSettings {
    /// Evaluation strategy.
    pub strategy: MatchStrategy,
    /// Worker threads for the parallel strategies.
    pub threads: usize,
    /// Capacity of the task queue used by the parallel strategy.
    pub queue_size: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            strategy: MatchStrategy::Serial,
            threads: 4,
            queue_size: 1024,
        }
    }
}
