//! XCQL input.
//!
//! Rebuilds a [`Query`] from its XML form. Children are looked up by local element name,
//! so their order inside a parent does not matter and namespaced documents are accepted.

use std::{collections::BTreeSet, panic, thread};

use roxmltree::{Document, Node};
use tracing::debug;

use crate::{
    ast::{
        Boolean, BooleanOp, ModifierClause, NodeId, PrefixedName, Query, QueryBuilder, Relation,
        SearchClause, Term,
    },
    config::ParserConfig,
    error::{Diagnostic, DiagnosticKind},
    lexer::Comparison,
};

/// Element nesting read on the calling thread.
const INLINE_NESTING: usize = 64;

/// Stack for the reader thread before per-element growth.
const READER_STACK_BASE: usize = 1024 * 1024;

/// Stack reserved per level of element nesting on the reader thread.
const STACK_PER_ELEMENT: usize = 32 * 1024;

/// Walks an XCQL DOM into a query arena.
struct XcqlReader<'c> {
    /// Arena under construction.
    builder: QueryBuilder<'c>,
    /// Current triple nesting depth.
    depth: usize,
}

impl<'c> XcqlReader<'c> {
    /// Reads a `searchClause` or `triple` element.
    fn node(&mut self, node: Node<'_, '_>) -> Result<NodeId, Diagnostic> {
        let id = match node.tag_name().name() {
            "searchClause" => self.search_clause(node)?,
            "triple" => self.triple(node)?,
            other => {
                return Err(Diagnostic::syntax(format!("Unknown element: {other}")));
            }
        };
        if let Some(prefixes) = child(node, "prefixes") {
            self.prefixes(id, prefixes)?;
        }
        Ok(id)
    }

    /// Reads `<searchClause>`: index, relation and term.
    fn search_clause(&mut self, node: Node<'_, '_>) -> Result<NodeId, Diagnostic> {
        only_children(node, &["prefixes", "index", "relation", "term"])?;
        let config = self.builder.config();
        let index = PrefixedName::parse(text(required(node, "index")?).trim(), config)?;
        let relation = self.relation(required(node, "relation")?)?;
        let term = Term::literal(text(required(node, "term")?), config)?;
        Ok(self.builder.push_clause(SearchClause {
            index,
            relation,
            term,
        }))
    }

    /// Reads `<relation>`: value and optional modifiers.
    fn relation(&self, node: Node<'_, '_>) -> Result<Relation, Diagnostic> {
        only_children(node, &["value", "modifiers"])?;
        let name = PrefixedName::parse(text(required(node, "value")?).trim(), self.builder.config())?;
        Ok(Relation {
            name,
            modifiers: self.modifiers(node)?,
        })
    }

    /// Reads `<triple>`: boolean and both operands.
    fn triple(&mut self, node: Node<'_, '_>) -> Result<NodeId, Diagnostic> {
        let limit = self.builder.config().max_depth;
        if self.depth >= limit {
            return Err(Diagnostic::too_deep(limit));
        }
        self.depth += 1;

        only_children(node, &["prefixes", "boolean", "leftOperand", "rightOperand"])?;
        let boolean = self.boolean(required(node, "boolean")?)?;
        let left = self.operand(required(node, "leftOperand")?)?;
        let right = self.operand(required(node, "rightOperand")?)?;

        self.depth -= 1;
        Ok(self.builder.push_triple(left, boolean, right))
    }

    /// Reads the single query element inside an operand.
    fn operand(&mut self, node: Node<'_, '_>) -> Result<NodeId, Diagnostic> {
        let mut children = node.children().filter(Node::is_element);
        let inner = children.next().ok_or_else(|| {
            Diagnostic::syntax(format!("Empty element: {}", node.tag_name().name()))
        })?;
        if let Some(extra) = children.next() {
            return Err(unknown_element(node, extra));
        }
        self.node(inner)
    }

    /// Reads `<boolean>`: value and optional modifiers.
    fn boolean(&self, node: Node<'_, '_>) -> Result<Boolean, Diagnostic> {
        only_children(node, &["value", "modifiers"])?;
        let op: BooleanOp = text(required(node, "value")?).trim().parse()?;
        Ok(Boolean {
            op,
            modifiers: self.modifiers(node)?,
        })
    }

    /// Reads the `<modifiers>` child of `parent`, if present.
    fn modifiers(&self, parent: Node<'_, '_>) -> Result<Vec<ModifierClause>, Diagnostic> {
        let Some(list) = child(parent, "modifiers") else {
            return Ok(Vec::new());
        };
        only_children(list, &["modifier"])?;
        elements(list, "modifier")
            .map(|modifier| self.modifier(modifier))
            .collect()
    }

    /// Reads one `<modifier>`. A value without a comparison implies `=`.
    fn modifier(&self, node: Node<'_, '_>) -> Result<ModifierClause, Diagnostic> {
        only_children(node, &["type", "comparison", "value"])?;
        let kind = text(required(node, "type")?).trim();
        if kind.is_empty() {
            return Err(Diagnostic::new(DiagnosticKind::NullModifier, "Null modifier"));
        }
        let name = PrefixedName::parse(kind, self.builder.config())?;

        let comparison = child(node, "comparison")
            .map(|c| {
                let op = text(c).trim();
                op.parse::<Comparison>()
                    .map_err(|()| Diagnostic::syntax(format!("Unknown comparison: {op}")))
            })
            .transpose()?;
        let value = child(node, "value").map(|v| text(v).to_string());

        match (comparison, value) {
            (Some(_), None) => Err(Diagnostic::new(
                DiagnosticKind::NullModifier,
                format!("Missing value for modifier {name}"),
            )),
            (None, Some(value)) => Ok(ModifierClause {
                name,
                comparison: Some(Comparison::Eq),
                value: Some(value),
            }),
            (comparison, value) => Ok(ModifierClause {
                name,
                comparison,
                value,
            }),
        }
    }

    /// Attaches every `<prefix>` inside `<prefixes>` to `id`.
    fn prefixes(&mut self, id: NodeId, node: Node<'_, '_>) -> Result<(), Diagnostic> {
        only_children(node, &["prefix"])?;
        let strict = self.builder.config().error_on_duplicate_prefix;
        let mut declared = BTreeSet::new();
        for prefix in elements(node, "prefix") {
            only_children(prefix, &["name", "identifier"])?;
            let name = child(prefix, "name").map_or("", |n| text(n).trim());
            if strict && !declared.insert(name) {
                return Err(Diagnostic::new(DiagnosticKind::DuplicatePrefix, name));
            }
            let identifier = text(required(prefix, "identifier")?).trim().to_string();
            self.builder.add_prefix(id, name.to_lowercase(), identifier)?;
        }
        Ok(())
    }
}

/// Returns the first child element with the given local name.
fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

/// Like [`child`], failing with diagnostic 10 when the element is missing.
fn required<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Result<Node<'a, 'input>, Diagnostic> {
    child(node, name).ok_or_else(|| {
        Diagnostic::syntax(format!(
            "Missing <{name}> in <{}>",
            node.tag_name().name()
        ))
    })
}

/// Iterates child elements with the given local name.
fn elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |c| c.is_element() && c.tag_name().name() == name)
}

/// Fails with diagnostic 10 on the first child element whose name is not in `allowed`.
fn only_children(node: Node<'_, '_>, allowed: &[&str]) -> Result<(), Diagnostic> {
    match node
        .children()
        .filter(Node::is_element)
        .find(|c| !allowed.contains(&c.tag_name().name()))
    {
        Some(unknown) => Err(unknown_element(node, unknown)),
        None => Ok(()),
    }
}

/// Builds the error for an element that may not appear inside `parent`.
fn unknown_element(parent: Node<'_, '_>, element: Node<'_, '_>) -> Diagnostic {
    Diagnostic::syntax(format!(
        "Unknown element: {} in <{}>",
        element.tag_name().name(),
        parent.tag_name().name()
    ))
}

/// Returns the deepest element nesting in `xml`.
///
/// A tag-level scan run before building the DOM. Markup inside comments or CDATA may be
/// counted, which only makes the estimate high.
fn element_depth(xml: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0;
    let mut rest = xml;
    while let Some(start) = rest.find('<') {
        rest = &rest[start + 1..];
        let end = rest.find('>').unwrap_or(rest.len());
        let tag = &rest[..end];
        if tag.starts_with('/') {
            depth = depth.saturating_sub(1);
        } else if !(tag.starts_with('?') || tag.starts_with('!') || tag.ends_with('/')) {
            depth += 1;
            deepest = deepest.max(depth);
        }
        rest = &rest[end..];
    }
    deepest
}

/// Text content of an element; empty when it has none.
fn text<'a>(node: Node<'a, '_>) -> &'a str {
    node.text().unwrap_or_default()
}

/// Parses an XCQL document with the default configuration.
pub fn xmlparse(xml: &str) -> Result<Query, Diagnostic> {
    xmlparse_with(xml, &ParserConfig::default())
}

/// Parses an XCQL document with an explicit configuration.
///
/// Documents nesting elements more than 64 deep are read on a helper thread whose stack
/// grows with the nesting.
pub fn xmlparse_with(xml: &str, config: &ParserConfig) -> Result<Query, Diagnostic> {
    let nesting = element_depth(xml);
    // Two elements per triple level, plus room for the deepest clause content.
    if nesting > config.max_depth.saturating_mul(2).saturating_add(8) {
        return Err(Diagnostic::too_deep(config.max_depth));
    }
    if nesting <= INLINE_NESTING {
        return read_document(xml, config);
    }

    thread::scope(|scope| {
        let reader = thread::Builder::new()
            .name("xcql-reader".into())
            .stack_size(READER_STACK_BASE.saturating_add(nesting.saturating_mul(STACK_PER_ELEMENT)))
            .spawn_scoped(scope, || read_document(xml, config))
            .map_err(|e| Diagnostic::syntax(format!("Could not start XCQL reader: {e}")))?;
        reader.join().unwrap_or_else(|e| panic::resume_unwind(e))
    })
}

/// Builds the DOM and walks it into a query.
fn read_document(xml: &str, config: &ParserConfig) -> Result<Query, Diagnostic> {
    let doc = Document::parse(xml).map_err(|e| Diagnostic::syntax(format!("Malformed XCQL: {e}")))?;
    debug!(root = doc.root_element().tag_name().name(), "xcql document");

    let mut reader = XcqlReader {
        builder: QueryBuilder::new(config),
        depth: 0,
    };
    let root = reader.node(doc.root_element())?;
    Ok(reader.builder.finish(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ast::AstNode, parse};

    fn round_trip(q: &str) {
        let query = parse(q).unwrap();
        let rebuilt = xmlparse(&query.to_xcql(0)).unwrap();
        assert!(query.structurally_eq(&rebuilt), "{q}");
    }

    #[test]
    fn simple_clause() {
        let query = xmlparse(
            "<searchClause><index>dc.title</index><relation><value>any</value></relation><term>fish</term></searchClause>",
        )
        .unwrap();
        let clause = query.root().as_search_clause().unwrap();
        assert_eq!(clause.index.full_name(), "dc.title");
        assert_eq!(clause.relation.name.value(), "any");
        assert_eq!(clause.term.value(), "fish");
    }

    #[test]
    fn child_order_is_irrelevant() {
        let xml = r"<triple>
            <rightOperand><searchClause><term>b</term><relation><value>=</value></relation><index>x</index></searchClause></rightOperand>
            <leftOperand><searchClause><index>x</index><relation><value>=</value></relation><term>a</term></searchClause></leftOperand>
            <boolean><value>or</value></boolean>
        </triple>";
        let query = xmlparse(xml).unwrap();
        assert!(query.structurally_eq(&parse("x = a or x = b").unwrap()));
    }

    #[test]
    fn namespaced_document() {
        let xml = r#"<x:searchClause xmlns:x="http://www.loc.gov/zing/cql/xcql/"><x:index>t</x:index><x:relation><x:value>=</x:value></x:relation><x:term>v</x:term></x:searchClause>"#;
        assert!(xmlparse(xml).unwrap().structurally_eq(&parse("t = v").unwrap()));
    }

    #[test]
    fn prefixes_attach_and_resolve() {
        let xml = "<searchClause><prefixes><prefix><name>DC</name><identifier>urn:dc</identifier></prefix></prefixes><index>dc.title</index><relation><value>=</value></relation><term>x</term></searchClause>";
        let query = xmlparse(xml).unwrap();
        assert_eq!(query.root().index_uri(), Some("urn:dc"));
    }

    #[test]
    fn entities_are_decoded() {
        let xml = "<searchClause><index>t</index><relation><value>&lt;</value></relation><term>a&amp;b</term></searchClause>";
        let query = xmlparse(xml).unwrap();
        let clause = query.root().as_search_clause().unwrap();
        assert_eq!(clause.relation.name.value(), "<");
        assert_eq!(clause.term.value(), "a&b");
    }

    #[test]
    fn empty_term_element() {
        let xml = "<searchClause><index>t</index><relation><value>=</value></relation><term/></searchClause>";
        assert_eq!(xmlparse(xml).unwrap().root().as_search_clause().unwrap().term.value(), "");
        let err = xmlparse_with(xml, &ParserConfig::strict()).unwrap_err();
        assert_eq!(err.code(), 27);
    }

    #[test]
    fn errors() {
        assert_eq!(xmlparse("<searchClause>").unwrap_err().code(), 10);
        assert_eq!(xmlparse("<query/>").unwrap_err().code(), 10);
        let err = xmlparse("<searchClause><index>t</index><term>x</term></searchClause>").unwrap_err();
        assert_eq!(err.code(), 10);
        assert!(err.details.contains("relation"));
        let bad_bool = "<triple><boolean><value>xor</value></boolean><leftOperand/><rightOperand/></triple>";
        assert_eq!(xmlparse(bad_bool).unwrap_err().code(), 37);
        let empty_operand = "<triple><boolean><value>and</value></boolean><leftOperand/><rightOperand/></triple>";
        assert_eq!(xmlparse(empty_operand).unwrap_err().code(), 10);
    }

    #[test]
    fn unknown_elements_rejected() {
        let clause = "<index>t</index><relation><value>=</value></relation><term>x</term>";
        for xml in [
            format!("<searchClause>{clause}<bogus/></searchClause>"),
            format!(
                "<triple><boolean><value>and</value></boolean><leftOperand><searchClause>{clause}</searchClause></leftOperand><rightOperand><searchClause>{clause}</searchClause></rightOperand><junk/></triple>"
            ),
            "<searchClause><index>t</index><relation><value>=</value><extra/></relation><term>x</term></searchClause>".to_string(),
            "<searchClause><index>t</index><relation><value>=</value><modifiers><modifier><type>a</type><colour/></modifier></modifiers></relation><term>x</term></searchClause>".to_string(),
            "<searchClause><index>t</index><relation><value>=</value><modifiers><other/></modifiers></relation><term>x</term></searchClause>".to_string(),
            format!("<searchClause><prefixes><prefix><identifier>u</identifier><uri/></prefix></prefixes>{clause}</searchClause>"),
            format!("<searchClause><prefixes><namespace/></prefixes>{clause}</searchClause>"),
            format!(
                "<triple><boolean><value>and</value><flag/></boolean><leftOperand><searchClause>{clause}</searchClause></leftOperand><rightOperand><searchClause>{clause}</searchClause></rightOperand></triple>"
            ),
            format!(
                "<triple><boolean><value>and</value></boolean><leftOperand><searchClause>{clause}</searchClause><searchClause>{clause}</searchClause></leftOperand><rightOperand><searchClause>{clause}</searchClause></rightOperand></triple>"
            ),
        ] {
            let err = xmlparse(&xml).unwrap_err();
            assert_eq!(err.code(), 10, "{xml}");
            assert!(err.details.starts_with("Unknown element"), "{xml}: {err}");
        }

        let err = xmlparse(&format!("<searchClause>{clause}<bogus/></searchClause>")).unwrap_err();
        assert_eq!(err.details, "Unknown element: bogus in <searchClause>");
    }

    #[test]
    fn duplicate_prefix_names_in_strict_mode() {
        let doc = |first: &str, second: &str| {
            format!(
                "<searchClause><prefixes><prefix><name>{first}</name><identifier>x</identifier></prefix><prefix><name>{second}</name><identifier>y</identifier></prefix></prefixes><index>a.title</index><relation><value>=</value></relation><term>z</term></searchClause>"
            )
        };
        let strict = ParserConfig::strict();
        let query = xmlparse_with(&doc("a", "A"), &strict).unwrap();
        assert_eq!(query.root().index_uri(), Some("y"));
        assert_eq!(xmlparse_with(&doc("a", "a"), &strict).unwrap_err().code(), 45);
        assert_eq!(xmlparse(&doc("a", "a")).unwrap().root().index_uri(), Some("y"));
    }

    #[test]
    fn element_depth_skips_declarations_and_empty_tags() {
        assert_eq!(element_depth("<?xml version=\"1.0\"?><a><!-- c --><b/><c><d></d></c></a>"), 3);
        assert_eq!(element_depth("plain text"), 0);
    }

    #[test]
    fn hostile_nesting_fails_cleanly() {
        let depth = 100_000;
        let xml = format!("{}{}", "<triple>".repeat(depth), "</triple>".repeat(depth));
        let err = xmlparse(&xml).unwrap_err();
        assert_eq!(err.code(), 10);
        assert_eq!(err.details, "Query nested deeper than 256 levels");
    }

    #[test]
    fn deep_documents_are_read_off_thread() {
        let chain = vec!["a"; 150].join(" and ");
        let query = parse(&chain).unwrap();
        let xml = query.to_xcql(0);
        assert!(element_depth(&xml) > INLINE_NESTING);
        assert!(xmlparse(&xml).unwrap().structurally_eq(&query));
    }

    #[test]
    fn modifier_without_comparison_value_defaults() {
        let xml = "<searchClause><index>t</index><relation><value>=</value><modifiers><modifier><type>locale</type><value>en</value></modifier></modifiers></relation><term>x</term></searchClause>";
        let query = xmlparse(xml).unwrap();
        let clause = query.root().as_search_clause().unwrap();
        assert_eq!(clause.relation.modifiers[0].comparison, Some(Comparison::Eq));
    }

    #[test]
    fn round_trips() {
        for q in [
            "foo",
            "dc.title any \"hello world\"",
            "a and b or c",
            "(a or b) and (c not d)",
            "title =/relevant/locale=\"en us\" x prox/unit=word/distance>2 y",
            ">dc=\"urn:dc\" dc.title = x and >bath=\"urn:bath\" bath.name = y",
            "date <> \"<1999 & after>\"",
            r#"title = "say \"hi\" \*""#,
        ] {
            round_trip(q);
        }
    }
}
