//! Rendering and JSON serialization for CLI output.

use std::{
    fs,
    io::{self, IsTerminal, Read},
    path::Path,
    process::ExitCode,
};

use cql_highlight::Highlighter;
pub use cql_highlight::{dim, error, highlight_query, rule, subheader, success, warning};
use cql_parser::{AstNode, Diagnostic, ModifierClause, NodeRef, NodeView, PrefixMap, Query};
use serde::Serialize;

use crate::cli::args::Format;

/// JSON form of one parsed query.
#[derive(Serialize)]
pub struct JsonQuery<'a> {
    /// The query as given.
    pub query: &'a str,
    /// Canonical CQL.
    pub cql: String,
    /// XCQL.
    pub xcql: String,
    /// Result set id, empty when there is none.
    pub result_set_id: String,
    /// The tree.
    pub tree: JsonNode<'a>,
}

/// JSON form of a modifier.
#[derive(Serialize)]
pub struct JsonModifier<'a> {
    /// Modifier type.
    pub name: String,
    /// Comparison operator, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<&'static str>,
    /// Value, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<&'a str>,
}

/// JSON form of a node.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum JsonNode<'a> {
    /// `index relation term`.
    SearchClause {
        /// Prefixes declared on this node.
        #[serde(skip_serializing_if = "PrefixMap::is_empty")]
        prefixes: &'a PrefixMap,
        /// Index name.
        index: String,
        /// Resolved context set of the index.
        index_uri: Option<&'a str>,
        /// Relation name.
        relation: String,
        /// Relation modifiers.
        #[serde(skip_serializing_if = "Vec::is_empty")]
        modifiers: Vec<JsonModifier<'a>>,
        /// Term value.
        term: &'a str,
    },
    /// Boolean combination.
    Triple {
        /// Prefixes declared on this node.
        #[serde(skip_serializing_if = "PrefixMap::is_empty")]
        prefixes: &'a PrefixMap,
        /// Boolean operator.
        boolean: &'static str,
        /// Boolean modifiers.
        #[serde(skip_serializing_if = "Vec::is_empty")]
        modifiers: Vec<JsonModifier<'a>>,
        /// Left operand.
        left: Box<Self>,
        /// Right operand.
        right: Box<Self>,
    },
}

impl<'a> JsonNode<'a> {
    /// Converts a node and its subtree.
    pub fn from_node(node: NodeRef<'a>) -> Self {
        match node.view() {
            NodeView::SearchClause(clause) => Self::SearchClause {
                prefixes: node.prefixes(),
                index: clause.index.full_name(),
                index_uri: node.index_uri(),
                relation: clause.relation.name.full_name(),
                modifiers: json_modifiers(&clause.relation.modifiers),
                term: clause.term.value(),
            },
            NodeView::Triple {
                left,
                boolean,
                right,
            } => Self::Triple {
                prefixes: node.prefixes(),
                boolean: boolean.op.as_str(),
                modifiers: json_modifiers(&boolean.modifiers),
                left: Box::new(Self::from_node(left)),
                right: Box::new(Self::from_node(right)),
            },
        }
    }
}

/// Converts a modifier list.
fn json_modifiers(modifiers: &[ModifierClause]) -> Vec<JsonModifier<'_>> {
    modifiers
        .iter()
        .map(|m| JsonModifier {
            name: m.name.full_name(),
            comparison: m.comparison.map(|c| c.as_str()),
            value: m.value.as_deref(),
        })
        .collect()
}

impl<'a> JsonQuery<'a> {
    /// Builds the JSON document for a parsed query.
    pub fn new(input: &'a str, query: &'a Query) -> Self {
        Self {
            query: input,
            cql: query.to_cql(),
            xcql: query.to_xcql(0),
            result_set_id: query.result_set_id(),
            tree: JsonNode::from_node(query.root()),
        }
    }
}

/// Prints a query in the requested format.
pub fn print_query(input: &str, query: &Query, format: Format) -> Result<(), ExitCode> {
    match format {
        Format::Cql => println!("{}", query.to_cql()),
        Format::Xcql => print_highlighted(&query.to_xcql(0), "xml"),
        Format::Tree => print!("{query}"),
        Format::Json => print_json(&JsonQuery::new(input, query))?,
    }
    Ok(())
}

/// Prints a value as pretty JSON, highlighted on a terminal.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), ExitCode> {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            print_highlighted(&format!("{json}\n"), "json");
            Ok(())
        }
        Err(e) => {
            eprintln!("error: failed to serialize JSON: {e}");
            Err(ExitCode::FAILURE)
        }
    }
}

/// Prints content, highlighting it only when stdout is a terminal.
pub fn print_highlighted(content: &str, syntax: &str) {
    if io::stdout().is_terminal() {
        print!("{}", Highlighter::new().highlight(content, syntax));
    } else {
        print!("{content}");
    }
}

/// Prints a diagnostic and its hint to stderr.
pub fn report_diagnostic(diagnostic: &Diagnostic) {
    eprintln!("error: {diagnostic}");
    if let Some(hint) = diagnostic.hint() {
        eprintln!("hint: {hint}");
    }
}

/// Returns the given queries, or the non-blank lines of stdin when there are none.
pub fn queries_or_stdin(queries: &[String]) -> Result<Vec<String>, ExitCode> {
    if !queries.is_empty() {
        return Ok(queries.to_vec());
    }
    let input = read_stdin()?;
    Ok(input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Reads a file, or stdin for `None` and `-`.
pub fn read_input(path: Option<&Path>) -> Result<String, ExitCode> {
    match path {
        Some(path) if path != Path::new("-") => fs::read_to_string(path).map_err(|e| {
            eprintln!("error: failed to read {}: {e}", path.display());
            ExitCode::FAILURE
        }),
        _ => read_stdin(),
    }
}

/// Reads all of stdin.
fn read_stdin() -> Result<String, ExitCode> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input).map_err(|e| {
        eprintln!("error: failed to read stdin: {e}");
        ExitCode::FAILURE
    })?;
    Ok(input)
}

#[cfg(test)]
mod tests {
    use cql_parser::parse;

    use super::*;

    #[test]
    fn json_clause() {
        let query = parse(">dc=\"urn:dc\" dc.title any/cql.stem fish").unwrap();
        let value = serde_json::to_value(JsonQuery::new("q", &query)).unwrap();

        assert_eq!(value["query"], "q");
        assert_eq!(value["cql"], query.to_cql());
        assert_eq!(value["result_set_id"], "");

        let tree = &value["tree"];
        assert_eq!(tree["type"], "searchClause");
        assert_eq!(tree["index"], "dc.title");
        assert_eq!(tree["index_uri"], "urn:dc");
        assert_eq!(tree["relation"], "any");
        assert_eq!(tree["modifiers"][0]["name"], "cql.stem");
        assert!(tree["modifiers"][0].get("value").is_none());
        assert_eq!(tree["term"], "fish");
        assert_eq!(tree["prefixes"]["dc"], "urn:dc");
    }

    #[test]
    fn json_triple() {
        let query = parse("a prox/distance<3 b").unwrap();
        let value = serde_json::to_value(JsonQuery::new("q", &query)).unwrap();

        let tree = &value["tree"];
        assert_eq!(tree["type"], "triple");
        assert_eq!(tree["boolean"], "prox");
        assert_eq!(tree["modifiers"][0]["name"], "distance");
        assert_eq!(tree["modifiers"][0]["comparison"], "<");
        assert_eq!(tree["modifiers"][0]["value"], "3");
        assert_eq!(tree["left"]["term"], "a");
        assert_eq!(tree["right"]["term"], "b");
        assert!(tree.get("prefixes").is_none());
    }
}
