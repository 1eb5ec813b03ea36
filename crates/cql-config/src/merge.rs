//! Configuration merging.
//!
//! Folds the discovered `RawConfig` files into one `Config`, closest file first.

use std::path::{Path, PathBuf};

use cql_parser::{CqlVersion, PrefixMap};
use tracing::debug;

use crate::{Config, ConfigError, Settings, parse::RawConfig};

/// A parsed config file with its source path.
pub struct ParsedConfig {
    /// Path to the config file.
    pub path: PathBuf,
    /// Parsed raw configuration.
    pub config: RawConfig,
}

/// Merges configuration files into a single `Config`.
///
/// Files are given highest precedence first.
///
/// - `[parser]` keys: the highest-precedence file that sets a key wins.
/// - `[prefixes]`: tables are unioned; for a name defined twice the closer file wins. Names
///   are lower-cased, as the parser lower-cases prefixes in queries.
pub fn merge_configs(configs: &[ParsedConfig]) -> Result<Config, ConfigError> {
    let mut settings = Settings::default();
    for parsed in configs.iter().rev() {
        apply_parser_settings(&mut settings, parsed)?;
    }

    let mut prefixes = PrefixMap::new();
    for parsed in configs {
        for (name, uri) in parsed.config.prefixes.iter().flatten() {
            prefixes
                .entry(name.to_lowercase())
                .or_insert_with(|| uri.clone());
        }
    }

    let files: Vec<PathBuf> = configs.iter().map(|c| c.path.clone()).collect();
    let config_root = configs
        .first()
        .and_then(|c| c.path.parent())
        .map(Path::to_path_buf);
    debug!(files = files.len(), prefixes = prefixes.len(), "merged configuration");

    Ok(Config {
        settings,
        prefixes,
        files,
        config_root,
    })
}

/// Overwrites every key the file's `[parser]` section sets.
fn apply_parser_settings(result: &mut Settings, parsed: &ParsedConfig) -> Result<(), ConfigError> {
    let Some(raw) = &parsed.config.parser else {
        return Ok(());
    };

    if let Some(version) = &raw.version {
        result.version = version
            .parse::<CqlVersion>()
            .map_err(|message| ConfigError::InvalidValue {
                path: parsed.path.clone(),
                key: "parser.version".into(),
                message,
            })?;
    }
    if let Some(v) = raw.error_on_empty_term {
        result.error_on_empty_term = v;
    }
    if let Some(v) = raw.error_on_quoted_identifier {
        result.error_on_quoted_identifier = v;
    }
    if let Some(v) = raw.error_on_duplicate_prefix {
        result.error_on_duplicate_prefix = v;
    }
    if let Some(v) = raw.full_result_set_name_check {
        result.full_result_set_name_check = v;
    }
    if let Some(v) = raw.max_depth {
        result.max_depth = v;
    }
    Ok(())
}
