//! Configuration merging.
//!
//! Merges multiple `RawConfig` files into a single resolved `Config`.

use std::{collections::BTreeMap, path::PathBuf};

use crate::{
    Config, MatchingSettings, MonitorSettings, PresearcherSettings, WeightSettings,
    parse::{
        RawConfig, RawMatchingSettings, RawMonitorSettings, RawPresearcherSettings,
        RawWeightSettings,
    },
};

/// A parsed config file with its source path.
pub struct ParsedConfig {
    /// Path to the config file.
    pub path: PathBuf,
    /// Parsed raw configuration.
    pub config: RawConfig,
}

/// Merges multiple configuration files into a single resolved `Config`.
///
/// Configs should be provided in precedence order: highest precedence first (closest to CWD),
/// lowest precedence last (global config).
///
/// Merge rules:
/// - Scalar settings: first defined value wins
/// - Weight tables: merged per key, first definition of each key wins
pub fn merge_configs(configs: &[ParsedConfig]) -> Config {
    let mut config = Config {
        config_root: configs
            .first()
            .and_then(|c| c.path.parent())
            .map(|p| p.to_path_buf()),
        ..Config::default()
    };

    // Lowest precedence first so later writes win.
    for parsed in configs.iter().rev() {
        let raw = &parsed.config;
        if let Some(monitor) = &raw.monitor {
            apply_monitor(&mut config.monitor, monitor);
        }
        if let Some(presearcher) = &raw.presearcher {
            apply_presearcher(&mut config.presearcher, presearcher);
        }
        if let Some(weights) = &raw.weights {
            apply_weights(&mut config.weights, weights);
        }
        if let Some(matching) = &raw.matching {
            apply_matching(&mut config.matching, matching);
        }
    }

    config
}

/// Applies raw monitor settings, overwriting any present values.
fn apply_monitor(result: &mut MonitorSettings, raw: &RawMonitorSettings) {
    if let Some(v) = raw.slow_log_threshold {
        result.slow_log_threshold = v;
    }
    if let Some(v) = raw.commit_batch_size {
        result.commit_batch_size = v;
    }
    if let Some(v) = &raw.default_field {
        result.default_field.clone_from(v);
    }
    if let Some(v) = &raw.stemmer {
        result.stemmer.clone_from(v);
    }
}

/// Applies raw presearcher settings.
fn apply_presearcher(result: &mut PresearcherSettings, raw: &RawPresearcherSettings) {
    if let Some(v) = raw.kind {
        result.kind = v;
    }
    if let Some(v) = raw.passes {
        result.passes = v;
    }
    if let Some(v) = raw.min_weight {
        result.min_weight = v;
    }
    if let Some(v) = &raw.filter_field {
        result.filter_field.clone_from(v);
    }
    if let Some(v) = raw.wildcard_ngrams {
        result.wildcard_ngrams = v;
    }
    if let Some(v) = &raw.ngram_suffix {
        result.ngram_suffix.clone_from(v);
    }
    if let Some(v) = &raw.wildcard_token {
        result.wildcard_token.clone_from(v);
    }
    if let Some(v) = raw.max_token_size {
        result.max_token_size = v;
    }
}

/// Applies raw weight settings. Tables are merged key by key.
fn apply_weights(result: &mut WeightSettings, raw: &RawWeightSettings) {
    if let Some(v) = raw.any_factor {
        result.any_factor = v;
    }
    if let Some(v) = raw.length_a {
        result.length_a = v;
    }
    if let Some(v) = raw.length_k {
        result.length_k = v;
    }
    if let Some(v) = raw.combine {
        result.combine = v;
    }
    if let Some(v) = raw.frequency_n {
        result.frequency_n = v;
    }
    if let Some(v) = raw.frequency_k {
        result.frequency_k = v;
    }
    merge_table(&mut result.fields, raw.fields.as_ref());
    merge_table(&mut result.terms, raw.terms.as_ref());
    merge_table(&mut result.frequencies, raw.frequencies.as_ref());
}

/// Applies raw matching settings.
fn apply_matching(result: &mut MatchingSettings, raw: &RawMatchingSettings) {
    if let Some(v) = raw.strategy {
        result.strategy = v;
    }
    if let Some(v) = raw.threads {
        result.threads = v;
    }
    if let Some(v) = raw.queue_size {
        result.queue_size = v;
    }
}

/// Overlays the entries of `raw` onto `result`.
fn merge_table<V: Copy>(result: &mut BTreeMap<String, V>, raw: Option<&BTreeMap<String, V>>) {
    if let Some(raw) = raw {
        result.extend(raw.iter().map(|(k, v)| (k.clone(), *v)));
    }
}
