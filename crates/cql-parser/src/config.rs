//! Parser configuration: grammar version, strictness switches and default prefixes.

use std::{collections::BTreeMap, fmt, str::FromStr};

/// Mapping from prefix name to context set identifier (URI).
pub type PrefixMap = BTreeMap<String, String>;

/// The reserved index used when a term appears without an explicit index.
pub const SERVER_CHOICE_INDEX: &str = "cql.serverchoice";

/// Identifier of the reserved `srw` context set.
pub const SRW_CONTEXT_SET: &str = "http://www.loc.gov/zing/cql/srw-indexes/v1.0/";

/// Identifier of the reserved `cql` context set.
pub const CQL_CONTEXT_SET: &str = "http://www.loc.gov/zing/cql/contextSets/cql/v1.1/";

/// Prefixes that are always resolvable.
pub const RESERVED_PREFIXES: [(&str, &str); 2] =
    [("srw", SRW_CONTEXT_SET), ("cql", CQL_CONTEXT_SET)];

/// Default nesting limit for sub-queries.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Resolves a reserved prefix name.
pub fn reserved_prefix(name: &str) -> Option<&'static str> {
    RESERVED_PREFIXES
        .iter()
        .find(|(reserved, _)| *reserved == name)
        .map(|(_, uri)| *uri)
}

/// CQL grammar version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CqlVersion {
    /// CQL 1.1: the server-choice relation is `scr`.
    V1_1,
    /// CQL 1.2: the server-choice relation is `=`.
    #[default]
    V1_2,
}

impl CqlVersion {
    /// Returns the relation implied by a bare term.
    pub fn server_choice_relation(self) -> &'static str {
        match self {
            Self::V1_1 => "scr",
            Self::V1_2 => "=",
        }
    }
}

impl fmt::Display for CqlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1_1 => write!(f, "1.1"),
            Self::V1_2 => write!(f, "1.2"),
        }
    }
}

impl FromStr for CqlVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1.1" => Ok(Self::V1_1),
            "1.2" => Ok(Self::V1_2),
            other => Err(format!("unsupported CQL version '{other}' (expected 1.1 or 1.2)")),
        }
    }
}

/// Settings read at the start of every parse.
///
/// A configuration is an immutable value shared by reference; parses never mutate it, so one
/// instance may serve any number of concurrent parses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Grammar version, which selects the server-choice relation.
    pub version: CqlVersion,
    /// Reject empty terms with diagnostic 27.
    pub error_on_empty_term: bool,
    /// Reject quoted index, relation and modifier names with diagnostic 14.
    pub error_on_quoted_identifier: bool,
    /// Reject redeclared and reserved prefixes with diagnostic 45.
    pub error_on_duplicate_prefix: bool,
    /// Report a triple's result-set id only when every leaf agrees.
    pub full_result_set_name_check: bool,
    /// Maximum sub-query nesting depth.
    pub max_depth: usize,
    /// Server-level prefixes consulted after the whole tree has been searched.
    pub default_prefixes: PrefixMap,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            version: CqlVersion::default(),
            error_on_empty_term: false,
            error_on_quoted_identifier: false,
            error_on_duplicate_prefix: false,
            full_result_set_name_check: true,
            max_depth: DEFAULT_MAX_DEPTH,
            default_prefixes: PrefixMap::new(),
        }
    }
}

impl ParserConfig {
    /// Returns a configuration with every strictness switch enabled.
    pub fn strict() -> Self {
        Self {
            error_on_empty_term: true,
            error_on_quoted_identifier: true,
            error_on_duplicate_prefix: true,
            ..Self::default()
        }
    }
}
