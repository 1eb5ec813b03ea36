//! Configuration file parsing.
//!
//! Parses individual `.cql.toml` files into `RawConfig` values whose fields all stay optional
//! until merging.

use std::{collections::BTreeMap, fs, path::Path};

use serde::Deserialize;
#[cfg(test)]
use toml::de::Error as TomlError;

use crate::ConfigError;

/// Raw configuration as parsed directly from a TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// When true, stop discovery here and ignore parent and global configs.
    pub root: Option<bool>,
    /// `[parser]` section.
    pub parser: Option<RawParserSettings>,
    /// `[prefixes]` section: prefix name to context set identifier.
    pub prefixes: Option<BTreeMap<String, String>>,
}

/// Raw `[parser]` settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawParserSettings {
    /// Grammar version, `"1.1"` or `"1.2"`.
    pub version: Option<String>,
    /// Reject empty terms.
    pub error_on_empty_term: Option<bool>,
    /// Reject quoted index, relation and modifier names.
    pub error_on_quoted_identifier: Option<bool>,
    /// Reject redeclared and reserved prefixes.
    pub error_on_duplicate_prefix: Option<bool>,
    /// Require all leaves of a triple to agree on the result set id.
    pub full_result_set_name_check: Option<bool>,
    /// Sub-query nesting limit.
    pub max_depth: Option<usize>,
}

/// Reads and parses a configuration file.
pub fn parse_config_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config_str(&contents, path)
}

/// Parses configuration from a TOML string; `path` is used for error reporting.
pub fn parse_config_str(contents: &str, path: &Path) -> Result<RawConfig, ConfigError> {
    toml::from_str(contents).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses configuration without path context (template checks only).
#[cfg(test)]
pub fn parse_config(contents: &str) -> Result<RawConfig, TomlError> {
    toml::from_str(contents)
}

/// Returns true if the file at `path` sets `root = true`.
///
/// Unreadable or malformed files count as non-root; loading reports them later.
pub fn is_root_config(path: &Path) -> bool {
    fs::read_to_string(path)
        .ok()
        .and_then(|contents| toml::from_str::<RawConfig>(&contents).ok())
        .is_some_and(|config| config.root == Some(true))
}
