//! Canonical CQL and XCQL rendering.
//!
//! CQL output is fully parenthesized and always quotes terms, so `to_cql` is a
//! canonicalizing printer: re-parsing its output yields a structurally equal tree.

use std::fmt;

use crate::{
    ast::{
        AstNode, Boolean, BooleanOp, ModifierClause, NodeRef, NodeView, PrefixedName, Query,
        Relation, SearchClause, Term,
    },
    config::PrefixMap,
    lexer::{Comparison, is_word_char},
};

/// Indentation unit for XCQL.
const INDENT: &str = "  ";

/// Returns true if `s` would not survive the lexer as a single bare word.
fn needs_quotes(s: &str) -> bool {
    s.is_empty() || !s.chars().all(is_word_char)
}

/// Wraps `s` in double quotes, escaping embedded quotes.
fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\\\""))
}

/// Writes `s` bare if it lexes as one token, quoted otherwise.
fn write_name(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    if needs_quotes(s) {
        f.write_str(&quote(s))
    } else {
        f.write_str(s)
    }
}

/// Escapes text content for XML.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

impl fmt::Display for PrefixedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_name(f, &self.full_name())
    }
}

impl fmt::Display for ModifierClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(value) = &self.value {
            if let Some(comparison) = self.comparison {
                f.write_str(comparison.as_str())?;
            }
            write_name(f, value)?;
        }
        Ok(())
    }
}

/// Appends `/modifier` for each modifier.
fn fmt_modifiers(f: &mut fmt::Formatter<'_>, modifiers: &[ModifierClause]) -> fmt::Result {
    for modifier in modifiers {
        write!(f, "/{modifier}")?;
    }
    Ok(())
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name.full_name();
        if name.parse::<Comparison>().is_ok() {
            f.write_str(&name)?;
        } else if BooleanOp::from_keyword(&name).is_some() {
            f.write_str(&quote(&name))?;
        } else {
            write_name(f, &name)?;
        }
        fmt_modifiers(f, &self.modifiers)
    }
}

impl fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Boolean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op)?;
        fmt_modifiers(f, &self.modifiers)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote(self.value()))
    }
}

impl fmt::Display for SearchClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.index, self.relation, self.term)
    }
}

/// Renders `>name="uri"` declarations, or `>"uri"` for the unnamed prefix.
fn cql_prefixes(prefixes: &PrefixMap) -> Vec<String> {
    prefixes
        .iter()
        .map(|(name, uri)| {
            if name.is_empty() {
                format!(">{}", quote(uri))
            } else if needs_quotes(name) {
                format!(">{}={}", quote(name), quote(uri))
            } else {
                format!(">{name}={}", quote(uri))
            }
        })
        .collect()
}

/// XCQL fragment builder tracking the current indentation.
struct XmlWriter {
    /// Output buffer.
    out: String,
}

impl XmlWriter {
    /// Creates an empty writer.
    fn new() -> Self {
        Self { out: String::new() }
    }

    /// Writes an opening tag on its own line.
    fn open(&mut self, depth: usize, tag: &str) {
        self.line(depth, &format!("<{tag}>"));
    }

    /// Writes a closing tag on its own line.
    fn close(&mut self, depth: usize, tag: &str) {
        self.line(depth, &format!("</{tag}>"));
    }

    /// Writes `<tag>text</tag>` on one line, escaping the text.
    fn leaf(&mut self, depth: usize, tag: &str, text: &str) {
        self.line(depth, &format!("<{tag}>{}</{tag}>", escape_xml(text)));
    }

    /// Appends one indented line.
    fn line(&mut self, depth: usize, content: &str) {
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(content);
        self.out.push('\n');
    }

    /// Writes a `<prefixes>` block; nothing for an empty map.
    fn prefixes(&mut self, depth: usize, prefixes: &PrefixMap) {
        if prefixes.is_empty() {
            return;
        }
        self.open(depth, "prefixes");
        for (name, uri) in prefixes {
            self.open(depth + 1, "prefix");
            self.leaf(depth + 2, "name", name);
            self.leaf(depth + 2, "identifier", uri);
            self.close(depth + 1, "prefix");
        }
        self.close(depth, "prefixes");
    }

    /// Writes a `<modifiers>` block; nothing for an empty list.
    fn modifiers(&mut self, depth: usize, modifiers: &[ModifierClause]) {
        if modifiers.is_empty() {
            return;
        }
        self.open(depth, "modifiers");
        for modifier in modifiers {
            self.modifier(depth + 1, modifier);
        }
        self.close(depth, "modifiers");
    }

    /// Writes one modifier; a bare type fits on a single line.
    fn modifier(&mut self, depth: usize, modifier: &ModifierClause) {
        let kind = modifier.name.full_name();
        let Some(value) = &modifier.value else {
            self.line(
                depth,
                &format!("<modifier><type>{}</type></modifier>", escape_xml(&kind)),
            );
            return;
        };
        self.open(depth, "modifier");
        self.leaf(depth + 1, "type", &kind);
        if let Some(comparison) = modifier.comparison {
            self.leaf(depth + 1, "comparison", comparison.as_str());
        }
        self.leaf(depth + 1, "value", value);
        self.close(depth, "modifier");
    }

    /// Writes a search clause element.
    fn clause(&mut self, depth: usize, clause: &SearchClause, prefixes: &PrefixMap) {
        self.open(depth, "searchClause");
        self.prefixes(depth + 1, prefixes);
        self.leaf(depth + 1, "index", &clause.index.full_name());
        self.open(depth + 1, "relation");
        self.leaf(depth + 2, "value", &clause.relation.name.full_name());
        self.modifiers(depth + 2, &clause.relation.modifiers);
        self.close(depth + 1, "relation");
        self.leaf(depth + 1, "term", clause.term.value());
        self.close(depth, "searchClause");
    }

    /// Writes a triple element and both operands.
    fn node(&mut self, depth: usize, node: NodeRef<'_>) {
        match node.view() {
            NodeView::SearchClause(clause) => self.clause(depth, clause, node.prefixes()),
            NodeView::Triple {
                left,
                boolean,
                right,
            } => {
                self.open(depth, "triple");
                self.prefixes(depth + 1, node.prefixes());
                self.open(depth + 1, "boolean");
                self.leaf(depth + 2, "value", boolean.op.as_str());
                self.modifiers(depth + 2, &boolean.modifiers);
                self.close(depth + 1, "boolean");
                self.open(depth + 1, "leftOperand");
                self.node(depth + 2, left);
                self.close(depth + 1, "leftOperand");
                self.open(depth + 1, "rightOperand");
                self.node(depth + 2, right);
                self.close(depth + 1, "rightOperand");
                self.close(depth, "triple");
            }
        }
    }
}

impl AstNode for NodeRef<'_> {
    fn to_cql(&self) -> String {
        let mut parts = cql_prefixes(self.prefixes());
        match self.view() {
            NodeView::SearchClause(clause) => {
                parts.push(clause.to_string());
                parts.join(" ")
            }
            NodeView::Triple {
                left,
                boolean,
                right,
            } => {
                if left.as_search_clause().is_some() && !left.prefixes().is_empty() {
                    parts.push(format!("({})", left.to_cql()));
                } else {
                    parts.push(left.to_cql());
                }
                parts.push(boolean.to_string());
                parts.push(right.to_cql());
                format!("({})", parts.join(" "))
            }
        }
    }

    fn to_xcql(&self, depth: usize) -> String {
        let mut writer = XmlWriter::new();
        writer.node(depth, *self);
        writer.out
    }

    fn resolve_prefix(&self, name: &str) -> Option<&str> {
        NodeRef::resolve_prefix(self, name)
    }
}

impl AstNode for Query {
    fn to_cql(&self) -> String {
        self.root().to_cql()
    }

    fn to_xcql(&self, depth: usize) -> String {
        self.root().to_xcql(depth)
    }

    fn resolve_prefix(&self, name: &str) -> Option<&str> {
        self.root().resolve_prefix(name)
    }
}
