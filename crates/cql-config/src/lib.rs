//! Configuration system for the cql tool.
//!
//! Configuration lives in TOML files named `.cql.toml`. Files are collected by walking up the
//! directory tree from the working directory, then `~/.cql.toml` is added with the lowest
//! precedence. The merged result turns into the [`ParserConfig`] every parse reads.

#![warn(missing_docs)]

mod discovery;
mod error;
mod merge;
mod parse;
mod templates;
#[cfg(test)]
mod test_support;
mod validate;

use std::path::{Path, PathBuf};

use cql_parser::{CqlVersion, DEFAULT_MAX_DEPTH, ParserConfig, PrefixMap};
pub use discovery::{CONFIG_FILENAME, discover_config_files, global_config_path, is_global_config};
pub use error::ConfigError;
pub use merge::{ParsedConfig, merge_configs};
pub use parse::{RawConfig, RawParserSettings, parse_config_file, parse_config_str};
use serde::Serialize;
pub use templates::{global_template, local_template};
pub use validate::ConfigWarning;
use validate::validate_config;

/// Merged configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parser settings.
    pub settings: Settings,
    /// Default context sets, consulted after all query-declared prefixes.
    pub prefixes: PrefixMap,
    /// Files that contributed, highest precedence first.
    pub files: Vec<PathBuf>,
    /// Directory of the most specific config file.
    pub config_root: Option<PathBuf>,
}

impl Config {
    /// Discovers and merges every `.cql.toml` that applies to `cwd`.
    ///
    /// Returns defaults when no file is found.
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        Self::load_from_files(&discover_config_files(cwd))
    }

    /// Loads and merges the given files, highest precedence first.
    pub fn load_from_files(files: &[PathBuf]) -> Result<Self, ConfigError> {
        let parsed = files
            .iter()
            .map(|path| {
                Ok(ParsedConfig {
                    path: path.clone(),
                    config: parse_config_file(path)?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        merge_configs(&parsed)
    }

    /// Returns warnings for settings that are legal but likely mistakes.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        validate_config(self)
    }

    /// Builds the parser configuration these settings describe.
    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig {
            version: self.settings.version,
            error_on_empty_term: self.settings.error_on_empty_term,
            error_on_quoted_identifier: self.settings.error_on_quoted_identifier,
            error_on_duplicate_prefix: self.settings.error_on_duplicate_prefix,
            full_result_set_name_check: self.settings.full_result_set_name_check,
            max_depth: self.settings.max_depth,
            default_prefixes: self.prefixes.clone(),
        }
    }

    /// Renders the effective settings in `.cql.toml` form.
    pub fn settings_to_toml(&self) -> Result<String, ConfigError> {
        let document = SerializableConfig {
            parser: SerializableParser::from(&self.settings),
            prefixes: &self.prefixes,
        };
        Ok(toml::to_string_pretty(&document)?)
    }
}

/// Resolved `[parser]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Grammar version.
    pub version: CqlVersion,
    /// Reject empty terms.
    pub error_on_empty_term: bool,
    /// Reject quoted index, relation and modifier names.
    pub error_on_quoted_identifier: bool,
    /// Reject redeclared and reserved prefixes.
    pub error_on_duplicate_prefix: bool,
    /// Require all leaves of a triple to agree on the result set id.
    pub full_result_set_name_check: bool,
    /// Sub-query nesting limit.
    pub max_depth: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CqlVersion::default(),
            error_on_empty_term: false,
            error_on_quoted_identifier: false,
            error_on_duplicate_prefix: false,
            full_result_set_name_check: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// TOML shape of the effective configuration.
#[derive(Serialize)]
struct SerializableConfig<'a> {
    /// `[parser]` table.
    parser: SerializableParser,
    /// `[prefixes]` table.
    prefixes: &'a PrefixMap,
}

/// `[parser]` table with the version rendered as a string.
#[derive(Serialize)]
struct SerializableParser {
    /// Grammar version.
    version: String,
    /// Reject empty terms.
    error_on_empty_term: bool,
    /// Reject quoted names.
    error_on_quoted_identifier: bool,
    /// Reject duplicate prefixes.
    error_on_duplicate_prefix: bool,
    /// Result set id consistency check.
    full_result_set_name_check: bool,
    /// Nesting limit.
    max_depth: usize,
}

impl From<&Settings> for SerializableParser {
    fn from(settings: &Settings) -> Self {
        Self {
            version: settings.version.to_string(),
            error_on_empty_term: settings.error_on_empty_term,
            error_on_quoted_identifier: settings.error_on_quoted_identifier,
            error_on_duplicate_prefix: settings.error_on_duplicate_prefix,
            full_result_set_name_check: settings.full_result_set_name_check,
            max_depth: settings.max_depth,
        }
    }
}
