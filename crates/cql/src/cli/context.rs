//! Shared context for running CLI commands.

use std::{
    env,
    path::{Path, PathBuf},
    process::ExitCode,
};

use cql_config::Config;
use cql_parser::ParserConfig;
use tracing::debug;

/// Command execution context built once per CLI invocation.
pub struct CommandContext {
    /// Current working directory.
    pub cwd: PathBuf,
    /// Loaded configuration (default when no config files are found or `--no-config`).
    pub config: Config,
    /// Parser configuration derived from `config`.
    pub parser: ParserConfig,
}

impl CommandContext {
    /// Loads the current directory and configuration.
    pub fn load() -> Result<Self, ExitCode> {
        let cwd = current_dir_or_failure()?;
        let config = load_config_or_failure(&cwd)?;
        for warning in config.validate() {
            debug!(%warning, "configuration warning");
        }
        Ok(Self::new(cwd, config))
    }

    /// Loads only the current directory, skipping configuration parsing.
    ///
    /// Used for `init` and `--no-config`, which must work even when an existing config
    /// file is invalid.
    pub fn load_cwd_only() -> Result<Self, ExitCode> {
        let cwd = current_dir_or_failure()?;
        Ok(Self::new(cwd, Config::default()))
    }

    /// Builds a context from an already loaded configuration.
    fn new(cwd: PathBuf, config: Config) -> Self {
        let parser = config.parser_config();
        Self {
            cwd,
            config,
            parser,
        }
    }
}

/// Returns the current working directory or exits with a consistent error.
fn current_dir_or_failure() -> Result<PathBuf, ExitCode> {
    env::current_dir().map_err(|e| {
        eprintln!("error: could not determine current directory: {e}");
        ExitCode::FAILURE
    })
}

/// Loads configuration from the provided directory or exits with an error.
fn load_config_or_failure(cwd: &Path) -> Result<Config, ExitCode> {
    Config::load(cwd).map_err(|e| {
        eprintln!("error: failed to load configuration: {e}");
        ExitCode::FAILURE
    })
}
