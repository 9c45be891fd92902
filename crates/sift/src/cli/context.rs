//! Shared context for running CLI commands.

use std::{
    env,
    path::{Path, PathBuf},
    process::ExitCode,
};

use sift_config::{Config, ConfigError, discover_config_files};
use tracing::debug;

/// Command execution context built once per CLI invocation.
pub struct CommandContext {
    /// Current working directory.
    pub cwd: PathBuf,
    /// Loaded configuration (default if no config files were found).
    pub config: Config,
    /// Files the configuration was loaded from, highest precedence first.
    pub config_files: Vec<PathBuf>,
}

impl CommandContext {
    /// Loads the current directory and configuration.
    ///
    /// An explicit config file replaces discovery.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ExitCode> {
        let cwd = current_dir_or_failure()?;
        let (config, config_files) = match explicit {
            Some(path) => (
                Config::load_file(path).map_err(|e| config_failure(&e))?,
                vec![path.to_path_buf()],
            ),
            None => (
                Config::load(&cwd).map_err(|e| config_failure(&e))?,
                discover_config_files(&cwd),
            ),
        };
        debug!(files = ?config_files, "loaded configuration");
        Ok(Self {
            cwd,
            config,
            config_files,
        })
    }
}

/// Returns the current working directory or exits with a consistent error.
fn current_dir_or_failure() -> Result<PathBuf, ExitCode> {
    env::current_dir().map_err(|e| {
        eprintln!("error: could not determine current directory: {e}");
        ExitCode::FAILURE
    })
}

/// Reports a configuration load failure.
fn config_failure(e: &ConfigError) -> ExitCode {
    eprintln!("error: failed to load configuration: {e}");
    ExitCode::FAILURE
}
