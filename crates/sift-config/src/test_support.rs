//! Scratch directory trees for config tests.

use std::{fs, path::PathBuf};

use tempfile::TempDir;

use crate::discovery::CONFIG_FILENAME;

/// A temporary directory that config files are written into.
pub struct ConfigTree {
    /// Owned temporary root.
    root: TempDir,
}

impl ConfigTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    /// Creates `rel` (and its parents) and returns its path. `""` is the root.
    pub fn dir(&self, rel: &str) -> PathBuf {
        let path = self.root.path().join(rel);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Writes `sift.toml` with `content` into directory `rel`.
    pub fn config(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.dir(rel).join(CONFIG_FILENAME);
        fs::write(&path, content).unwrap();
        path
    }
}
