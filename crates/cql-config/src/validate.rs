//! Configuration validation.
//!
//! Reports settings that load fine but will not behave as their author probably expects.

use std::fmt;

use cql_parser::reserved_prefix;

use crate::Config;

/// A non-fatal warning about the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A default prefix uses a reserved name and will never be consulted.
    ReservedPrefixShadowed {
        /// The prefix name.
        name: String,
    },
    /// A default prefix maps to an empty identifier.
    EmptyPrefixIdentifier {
        /// The prefix name.
        name: String,
    },
    /// `max_depth = 0` rejects every query.
    ZeroMaxDepth,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReservedPrefixShadowed { name } => {
                write!(f, "prefix '{name}' is reserved; the default entry is ignored")
            }
            Self::EmptyPrefixIdentifier { name } => {
                write!(f, "prefix '{name}' has an empty identifier")
            }
            Self::ZeroMaxDepth => write!(f, "parser.max_depth is 0; every query will be rejected"),
        }
    }
}

/// Checks the merged configuration and returns any warnings.
pub fn validate_config(config: &Config) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    if config.settings.max_depth == 0 {
        warnings.push(ConfigWarning::ZeroMaxDepth);
    }

    for (name, uri) in &config.prefixes {
        if reserved_prefix(name).is_some() {
            warnings.push(ConfigWarning::ReservedPrefixShadowed { name: name.clone() });
        }
        if uri.trim().is_empty() {
            warnings.push(ConfigWarning::EmptyPrefixIdentifier { name: name.clone() });
        }
    }

    warnings
}
