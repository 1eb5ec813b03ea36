//! Clap argument definitions for the `cql` CLI.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Top-level CLI options.
#[derive(Parser)]
#[command(name = "cql")]
#[command(about = "Parse, convert and inspect CQL queries")]
pub struct Cli {
    /// Verbosity (-v for debug logging, -vv for trace)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Ignore .cql.toml configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format flags for commands that print a parsed query.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct FormatArgs {
    /// Print XCQL instead of CQL
    #[arg(long, conflicts_with_all = ["tree", "json"])]
    pub xcql: bool,

    /// Print the parsed tree
    #[arg(long, conflicts_with = "json")]
    pub tree: bool,

    /// Print a JSON document
    #[arg(long)]
    pub json: bool,
}

/// How a parsed query is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Canonical CQL.
    Cql,
    /// XCQL.
    Xcql,
    /// Indented debugging tree.
    Tree,
    /// JSON document.
    Json,
}

impl FormatArgs {
    /// Resolves the flags to a single format.
    pub fn format(self) -> Format {
        if self.json {
            Format::Json
        } else if self.tree {
            Format::Tree
        } else if self.xcql {
            Format::Xcql
        } else {
            Format::Cql
        }
    }
}

/// Arguments for `cql parse`.
#[derive(Args, Debug, Clone)]
pub struct ParseCommand {
    /// Queries to parse; one per line from stdin when omitted
    pub queries: Vec<String>,

    #[command(flatten)]
    /// Output format.
    pub format: FormatArgs,
}

/// Arguments for `cql tokens`.
#[derive(Args, Debug, Clone)]
pub struct TokensCommand {
    /// Query to tokenize
    pub query: String,
}

/// Arguments for `cql xcql`.
#[derive(Args, Debug, Clone)]
pub struct XcqlCommand {
    /// XCQL document; stdin when omitted or `-`
    pub file: Option<PathBuf>,

    /// Re-emit normalized XCQL instead of CQL
    #[arg(long)]
    pub xcql: bool,
}

/// Arguments for `cql check`.
#[derive(Args, Debug, Clone)]
pub struct CheckCommand {
    /// Queries to check; one per line from stdin when omitted
    pub queries: Vec<String>,
}

/// Arguments for `cql init`.
#[derive(Args, Debug, Clone)]
pub struct InitCommand {
    /// Create global ~/.cql.toml instead
    #[arg(long)]
    pub global: bool,

    /// Overwrite existing configuration file
    #[arg(long)]
    pub force: bool,
}

/// Supported `cql` subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Parse queries and print them in canonical form
    #[command(after_help = "\
QUERY SYNTAX:
  fish                        Term under the server's choice of index
  dc.title any fish           Index, relation, term
  title = \"old man\"           Quoted term
  a and b or c                Booleans fold left to right
  a or (b and c)              Grouping
  title =/relevant x          Relation modifiers
  a prox/unit=word b          Boolean modifiers
  >dc=\"urn:dc\" dc.title = x   Prefix declaration

EXAMPLES:
  cql parse 'dc.title any fish'
  cql parse --xcql 'a and b'
  cql parse --json 'title = x not author = y'
  echo 'a or b' | cql parse")]
    Parse(ParseCommand),

    /// Show the token stream of a query
    Tokens(TokensCommand),

    /// Read an XCQL document and print it as CQL
    Xcql(XcqlCommand),

    /// Check queries for errors
    Check(CheckCommand),

    /// Show configuration files and effective settings
    Config,

    /// Initialize cql configuration in current directory
    Init(InitCommand),
}

/// Parses CLI arguments, exiting with usage on error.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn format_flags() {
        let cli = Cli::try_parse_from(["cql", "parse", "--xcql", "fish"]).unwrap();
        let Commands::Parse(cmd) = cli.command else {
            panic!("expected parse");
        };
        assert_eq!(cmd.format.format(), Format::Xcql);
        assert_eq!(cmd.queries, vec!["fish"]);
        assert_eq!(FormatArgs::default().format(), Format::Cql);
    }

    #[test]
    fn conflicting_formats_are_rejected() {
        assert!(Cli::try_parse_from(["cql", "parse", "--xcql", "--json", "fish"]).is_err());
        assert!(Cli::try_parse_from(["cql", "parse", "--tree", "--json", "fish"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["cql", "check", "-vv", "--no-config", "a"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.no_config);
    }
}
