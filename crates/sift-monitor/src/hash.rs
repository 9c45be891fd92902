//! Registration and settings hashes.
//!
//! A query re-registered with the same text, highlight text and metadata hashes to the
//! same value, which lets the monitor skip re-indexing it.
//!
//! A persistent presearch index also stores a hash of the settings that shape presearch
//! terms. Reopening the index under different settings re-indexes every stored query.
//! Settings that affect the hash:
//! - Schema version (internal, bumped when presearch fields change)
//! - Default field and stemmer
//! - Presearcher and weight settings

use std::{
    fs,
    hash::{Hash, Hasher},
    io,
    path::{Path, PathBuf},
};

use sift_config::Config;
use siphasher::sip::SipHasher24;

use crate::query::MonitorQuery;

/// Current presearch schema version.
pub const SCHEMA_VERSION: u32 = 2;

/// Name of the file holding the settings hash inside an index directory.
pub const SETTINGS_HASH_FILE: &str = "presearch_hash";

/// Computes the registration hash of a query. The id is not part of the hash.
pub fn query_hash(query: &MonitorQuery) -> u64 {
    let mut hasher = SipHasher24::new();
    query.query.hash(&mut hasher);
    query.highlight.hash(&mut hasher);
    query.metadata.hash(&mut hasher);
    hasher.finish()
}

/// Computes the hash of the presearch-shaping settings as a hex string.
pub fn settings_hash(config: &Config) -> String {
    let mut hasher = SipHasher24::new();
    SCHEMA_VERSION.hash(&mut hasher);
    config.monitor.default_field.hash(&mut hasher);
    config.monitor.stemmer.hash(&mut hasher);
    // Float settings have no `Hash`; their JSON rendering stands in.
    serde_json::to_string(&(&config.presearcher, &config.weights))
        .unwrap_or_default()
        .hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Returns the settings hash path of an index directory.
fn settings_hash_path(index_dir: &Path) -> PathBuf {
    index_dir.join(SETTINGS_HASH_FILE)
}

/// Reads the stored settings hash. Returns `None` if it is missing or unreadable.
pub fn read_settings_hash(index_dir: &Path) -> Option<String> {
    fs::read_to_string(settings_hash_path(index_dir))
        .ok()
        .map(|s| s.trim().to_string())
}

/// Writes the settings hash into an index directory.
pub fn write_settings_hash(index_dir: &Path, hash: &str) -> io::Result<()> {
    fs::create_dir_all(index_dir)?;
    fs::write(settings_hash_path(index_dir), hash)
}
