//! CQL abstract syntax tree.
//!
//! A parsed query is a [`Query`]: an arena of nodes addressed by [`NodeId`]. Each node is
//! either a [`SearchClause`] or a [`Triple`] whose operands are other nodes of the same
//! arena. Nodes carry their own prefix map and a parent id; the parent is used only to
//! resolve prefixes through enclosing scopes, never for ownership.

use std::{fmt, str::FromStr};

use tracing::debug;

use crate::{
    config::{CQL_CONTEXT_SET, ParserConfig, PrefixMap, SERVER_CHOICE_INDEX, reserved_prefix},
    error::{Diagnostic, DiagnosticKind},
    lexer::Comparison,
};

/// Tokens that may not appear unquoted as a term.
const BARE_OPERATORS: [&str; 7] = [">=", "<=", ">", "<", "<>", "/", "="];

/// Characters that may follow a backslash inside a term.
const ESCAPABLE: [char; 5] = ['"', '\\', '?', '*', '^'];

/// Index of a node inside its [`Query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A possibly prefixed, case-folded name: an index, a relation, or a modifier type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrefixedName {
    /// Context set prefix (the part before the dot).
    prefix: Option<String>,
    /// Name within the context set.
    value: String,
}

/// An index name such as `dc.title`.
pub type Index = PrefixedName;

impl PrefixedName {
    /// Builds a name from raw token text: lower-cases it, strips surrounding quotes and
    /// splits off the context set prefix.
    pub fn parse(raw: &str, config: &ParserConfig) -> Result<Self, Diagnostic> {
        let lowered = raw.to_lowercase();
        let name = if is_quoted(&lowered) {
            if config.error_on_quoted_identifier {
                return Err(Diagnostic::new(DiagnosticKind::Quote, lowered));
            }
            unquote(&lowered)
        } else {
            lowered
        };

        if name.matches('.').count() > 1 {
            return Err(Diagnostic::new(
                DiagnosticKind::MalformedIndex,
                format!("Multiple '.' characters: {name}"),
            ));
        }

        match name.split_once('.') {
            Some(("", _)) => Err(Diagnostic::new(
                DiagnosticKind::MalformedIndex,
                format!("Null indexset: {name}"),
            )),
            Some((prefix, value)) => Ok(Self {
                prefix: Some(prefix.to_string()),
                value: value.to_string(),
            }),
            None => Ok(Self {
                prefix: None,
                value: name,
            }),
        }
    }

    /// Creates a name from already normalized parts.
    pub fn new(prefix: Option<&str>, value: &str) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            value: value.to_string(),
        }
    }

    /// The reserved `cql.serverchoice` index.
    pub fn server_choice() -> Self {
        let (prefix, value) = SERVER_CHOICE_INDEX
            .split_once('.')
            .unwrap_or(("cql", "serverchoice"));
        Self::new(Some(prefix), value)
    }

    /// Returns the context set prefix, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Returns the name without its prefix.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns `prefix.value`, or just the value when there is no prefix.
    pub fn full_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}.{}", self.value),
            None => self.value.clone(),
        }
    }
}

/// Qualifies a relation or a boolean, e.g. `/unit=word` or `/relevant`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModifierClause {
    /// Modifier type.
    pub name: PrefixedName,
    /// Optional comparison operator.
    pub comparison: Option<Comparison>,
    /// Optional value, unquoted.
    pub value: Option<String>,
}

/// A relation with its modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    /// Operator or relation keyword, e.g. `=`, `any`, `cql.within`.
    pub name: PrefixedName,
    /// Relation modifiers in source order.
    pub modifiers: Vec<ModifierClause>,
}

impl Relation {
    /// Creates a relation without modifiers.
    pub fn new(name: PrefixedName) -> Self {
        Self {
            name,
            modifiers: Vec::new(),
        }
    }

    /// Returns the relational operator if this relation is one of `= > >= < <= <>`.
    pub fn comparison(&self) -> Option<Comparison> {
        match self.name.prefix() {
            Some(_) => None,
            None => self.name.value().parse().ok(),
        }
    }

    /// Looks up a modifier by type, matching either `prefix.value` or the bare value.
    pub fn modifier(&self, name: &str) -> Option<&ModifierClause> {
        find_modifier(&self.modifiers, name)
    }
}

/// Boolean operator joining two sub-queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanOp {
    /// `and`
    And,
    /// `or`
    Or,
    /// `not`
    Not,
    /// `prox`
    Prox,
}

impl BooleanOp {
    /// Returns the lower-case keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::Prox => "prox",
        }
    }

    /// Matches a keyword case-insensitively.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            "not" => Some(Self::Not),
            "prox" => Some(Self::Prox),
            _ => None,
        }
    }
}

impl FromStr for BooleanOp {
    type Err = Diagnostic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_keyword(s).ok_or_else(|| Diagnostic::new(DiagnosticKind::ExpectedBoolean, s))
    }
}

/// A boolean with its modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Boolean {
    /// The operator.
    pub op: BooleanOp,
    /// Boolean modifiers in source order.
    pub modifiers: Vec<ModifierClause>,
}

impl Boolean {
    /// Creates a boolean without modifiers.
    pub fn new(op: BooleanOp) -> Self {
        Self {
            op,
            modifiers: Vec::new(),
        }
    }

    /// Looks up a modifier by type.
    pub fn modifier(&self, name: &str) -> Option<&ModifierClause> {
        find_modifier(&self.modifiers, name)
    }
}

/// Finds a modifier whose type matches `name` in full or by value.
fn find_modifier<'m>(modifiers: &'m [ModifierClause], name: &str) -> Option<&'m ModifierClause> {
    modifiers
        .iter()
        .find(|m| m.name.full_name() == name || m.name.value() == name)
}

/// A search term. Backslash escapes of masking characters (`\*`, `\?`, `\^`, `\\`) are kept
/// verbatim; only `\"` is unescaped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Term {
    /// The unquoted term value.
    value: String,
}

impl Term {
    /// Builds a term from a raw token, validating and unquoting it.
    pub fn parse(raw: &str, config: &ParserConfig) -> Result<Self, Diagnostic> {
        if BARE_OPERATORS.contains(&raw) {
            return Err(Diagnostic::new(DiagnosticKind::BareRelation, raw));
        }

        let body = if is_quoted(raw) {
            &raw[1..raw.len() - 1]
        } else {
            raw
        };

        if !body.is_empty() && body.chars().all(|c| c == '^') {
            return Err(Diagnostic::new(
                DiagnosticKind::AnchorOnly,
                format!("Only anchoring character(s) in term: {raw}"),
            ));
        }

        let mut value = String::with_capacity(body.len());
        let mut chars = body.chars();
        while let Some(ch) = chars.next() {
            if ch != '\\' {
                value.push(ch);
                continue;
            }
            match chars.next() {
                Some('"') => value.push('"'),
                Some(escaped) if ESCAPABLE.contains(&escaped) => {
                    value.push('\\');
                    value.push(escaped);
                }
                _ => return Err(Diagnostic::new(DiagnosticKind::BadEscape, raw)),
            }
        }

        Self::literal(value, config)
    }

    /// Builds a term from an already unquoted value, as found in XCQL.
    pub fn literal(value: impl Into<String>, config: &ParserConfig) -> Result<Self, Diagnostic> {
        let value = value.into();
        if value.is_empty() && config.error_on_empty_term {
            return Err(Diagnostic::new(DiagnosticKind::EmptyTerm, ""));
        }
        Ok(Self { value })
    }

    /// Returns the term value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// CQL's atomic query unit: `index relation term`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchClause {
    /// The index searched.
    pub index: Index,
    /// The relation between index and term.
    pub relation: Relation,
    /// The search term.
    pub term: Term,
}

impl SearchClause {
    /// Creates a clause under the server-choice index and relation.
    pub fn server_choice(term: Term, config: &ParserConfig) -> Self {
        Self {
            index: PrefixedName::server_choice(),
            relation: Relation::new(PrefixedName::new(
                None,
                config.version.server_choice_relation(),
            )),
            term,
        }
    }
}

/// A boolean combination of two sub-queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    /// Left operand.
    pub left: NodeId,
    /// Boolean operator.
    pub boolean: Boolean,
    /// Right operand.
    pub right: NodeId,
}

/// The payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A search clause.
    SearchClause(SearchClause),
    /// A triple.
    Triple(Triple),
}

/// An arena entry.
#[derive(Debug, Clone)]
struct Node {
    /// Clause or triple.
    kind: NodeKind,
    /// Prefixes declared on this node.
    prefixes: PrefixMap,
    /// The enclosing triple, set once when the triple is built.
    parent: Option<NodeId>,
    /// Triples between this node and its deepest clause; zero for a clause.
    height: usize,
}

/// A parsed CQL query.
#[derive(Debug, Clone)]
pub struct Query {
    /// All nodes of the tree.
    nodes: Vec<Node>,
    /// The top node.
    root: NodeId,
    /// Configuration the query was parsed with.
    config: ParserConfig,
}

impl Query {
    /// Returns a handle to the root node.
    pub fn root(&self) -> NodeRef<'_> {
        self.node(self.root)
    }

    /// Returns a handle to the node with the given id.
    ///
    /// # Panics
    ///
    /// Panics if `id` belongs to a different query.
    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        assert!(id.0 < self.nodes.len(), "node id out of range");
        NodeRef { query: self, id }
    }

    /// Returns the number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a query has at least one clause.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the configuration used to build this query.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Returns the named result set this query refers to, or an empty string.
    pub fn result_set_id(&self) -> String {
        self.root().result_set_id()
    }

    /// Compares tree shape and clause/boolean values, ignoring prefix maps.
    pub fn structurally_eq(&self, other: &Self) -> bool {
        self.root().structurally_eq(other.root())
    }

    /// Returns every search clause in left-to-right order.
    pub fn clauses(&self) -> Vec<NodeRef<'_>> {
        let mut out = Vec::new();
        self.root().collect_clauses(&mut out);
        out
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root().fmt_tree(f, 0)
    }
}

/// A borrowed view of a node, with its resolution scope.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    /// The owning query.
    query: &'a Query,
    /// The node addressed.
    id: NodeId,
}

/// What a node is, with operands already resolved to handles.
#[derive(Debug, Clone, Copy)]
pub enum NodeView<'a> {
    /// A search clause.
    SearchClause(&'a SearchClause),
    /// A triple.
    Triple {
        /// Left operand.
        left: NodeRef<'a>,
        /// Boolean operator.
        boolean: &'a Boolean,
        /// Right operand.
        right: NodeRef<'a>,
    },
}

impl<'a> NodeRef<'a> {
    /// Returns the node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the arena entry.
    fn entry(&self) -> &'a Node {
        &self.query.nodes[self.id.0]
    }

    /// Returns the node payload with operands as ids.
    pub fn kind(&self) -> &'a NodeKind {
        &self.entry().kind
    }

    /// Returns what this node is.
    pub fn view(&self) -> NodeView<'a> {
        match &self.entry().kind {
            NodeKind::SearchClause(clause) => NodeView::SearchClause(clause),
            NodeKind::Triple(triple) => NodeView::Triple {
                left: self.query.node(triple.left),
                boolean: &triple.boolean,
                right: self.query.node(triple.right),
            },
        }
    }

    /// Returns the clause if this node is one.
    pub fn as_search_clause(&self) -> Option<&'a SearchClause> {
        match &self.entry().kind {
            NodeKind::SearchClause(clause) => Some(clause),
            NodeKind::Triple(_) => None,
        }
    }

    /// Returns the triple if this node is one.
    pub fn as_triple(&self) -> Option<&'a Triple> {
        match &self.entry().kind {
            NodeKind::Triple(triple) => Some(triple),
            NodeKind::SearchClause(_) => None,
        }
    }

    /// Returns the prefixes declared directly on this node.
    pub fn prefixes(&self) -> &'a PrefixMap {
        &self.entry().prefixes
    }

    /// Returns the enclosing triple.
    pub fn parent(&self) -> Option<Self> {
        self.entry().parent.map(|id| self.query.node(id))
    }

    /// Resolves a prefix: own map, reserved prefixes, enclosing scopes, then the server
    /// defaults from the configuration. Unknown prefixes resolve to `None`.
    pub fn resolve_prefix(&self, name: &str) -> Option<&'a str> {
        if let Some(uri) = self.prefixes().get(name) {
            return Some(uri);
        }
        if let Some(uri) = reserved_prefix(name) {
            return Some(uri);
        }
        let mut scope = self.parent();
        while let Some(node) = scope {
            if let Some(uri) = node.prefixes().get(name) {
                return Some(uri);
            }
            scope = node.parent();
        }
        self.query
            .config
            .default_prefixes
            .get(name)
            .map(String::as_str)
    }

    /// Resolves the context set of this clause's index. Unprefixed indexes resolve the
    /// unnamed (`>uri`) prefix.
    pub fn index_uri(&self) -> Option<&'a str> {
        let clause = self.as_search_clause()?;
        self.resolve_prefix(clause.index.prefix().unwrap_or(""))
    }

    /// Resolves the context set of this clause's relation.
    pub fn relation_uri(&self) -> Option<&'a str> {
        let clause = self.as_search_clause()?;
        self.resolve_prefix(clause.relation.name.prefix().unwrap_or(""))
    }

    /// Returns the result-set id referenced by this node, or an empty string.
    ///
    /// A clause refers to a result set when its index is `cql.resultsetid`. A triple does
    /// so only when result-set name checking is enabled, no boolean in it is `not` or
    /// `prox`, and all of its leaves name the same result set.
    pub fn result_set_id(&self) -> String {
        match self.view() {
            NodeView::SearchClause(clause) => {
                if self.index_uri() == Some(CQL_CONTEXT_SET)
                    && clause.index.value() == "resultsetid"
                {
                    clause.term.value().to_string()
                } else {
                    String::new()
                }
            }
            NodeView::Triple { .. } => {
                if !self.query.config.full_result_set_name_check {
                    return String::new();
                }
                let mut ids = Vec::new();
                if !self.collect_result_set_ids(&mut ids) {
                    return String::new();
                }
                match ids.split_first() {
                    Some((first, rest)) if rest.iter().all(|id| id == first) => first.clone(),
                    _ => String::new(),
                }
            }
        }
    }

    /// Gathers leaf result-set ids; returns false if a `not`/`prox` triple is found.
    fn collect_result_set_ids(&self, ids: &mut Vec<String>) -> bool {
        match self.view() {
            NodeView::SearchClause(_) => {
                ids.push(self.result_set_id());
                true
            }
            NodeView::Triple {
                left,
                boolean,
                right,
            } => {
                !matches!(boolean.op, BooleanOp::Not | BooleanOp::Prox)
                    && left.collect_result_set_ids(ids)
                    && right.collect_result_set_ids(ids)
            }
        }
    }

    /// Compares tree shape and clause/boolean values, ignoring prefix maps.
    pub fn structurally_eq(&self, other: NodeRef<'_>) -> bool {
        match (self.view(), other.view()) {
            (NodeView::SearchClause(a), NodeView::SearchClause(b)) => a == b,
            (
                NodeView::Triple {
                    left: l1,
                    boolean: b1,
                    right: r1,
                },
                NodeView::Triple {
                    left: l2,
                    boolean: b2,
                    right: r2,
                },
            ) => b1 == b2 && l1.structurally_eq(l2) && r1.structurally_eq(r2),
            _ => false,
        }
    }

    /// Pushes every clause below this node, left to right.
    fn collect_clauses(&self, out: &mut Vec<Self>) {
        match self.view() {
            NodeView::SearchClause(_) => out.push(*self),
            NodeView::Triple { left, right, .. } => {
                left.collect_clauses(out);
                right.collect_clauses(out);
            }
        }
    }

    /// Formats the subtree as an indented debugging tree.
    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);
        for (name, uri) in self.prefixes() {
            writeln!(f, "{pad}Prefix({name:?} => {uri:?})")?;
        }
        match self.view() {
            NodeView::SearchClause(clause) => writeln!(
                f,
                "{pad}SearchClause({} {} {:?})",
                clause.index, clause.relation, clause.term.value()
            ),
            NodeView::Triple {
                left,
                boolean,
                right,
            } => {
                writeln!(f, "{pad}Triple({boolean})")?;
                left.fmt_tree(f, indent + 1)?;
                right.fmt_tree(f, indent + 1)
            }
        }
    }
}

/// Capabilities shared by every node of the tree.
pub trait AstNode {
    /// Renders canonical, fully parenthesized CQL.
    fn to_cql(&self) -> String;

    /// Renders an indented XCQL fragment starting at `depth` levels of indentation.
    fn to_xcql(&self, depth: usize) -> String;

    /// Resolves a prefix name through the enclosing scopes.
    fn resolve_prefix(&self, name: &str) -> Option<&str>;
}

/// Accumulates nodes while a query is being parsed.
pub struct QueryBuilder<'c> {
    /// Nodes built so far.
    nodes: Vec<Node>,
    /// Active configuration.
    config: &'c ParserConfig,
}

impl<'c> QueryBuilder<'c> {
    /// Creates an empty builder.
    pub fn new(config: &'c ParserConfig) -> Self {
        Self {
            nodes: Vec::new(),
            config,
        }
    }

    /// Adds a clause node.
    pub fn push_clause(&mut self, clause: SearchClause) -> NodeId {
        debug!(
            index = %clause.index,
            relation = %clause.relation,
            term = clause.term.value(),
            "search clause"
        );
        self.push(NodeKind::SearchClause(clause))
    }

    /// Adds a triple node and makes it the parent of both operands.
    pub fn push_triple(&mut self, left: NodeId, boolean: Boolean, right: NodeId) -> NodeId {
        debug!(boolean = %boolean, "triple");
        let height = self.height(left).max(self.height(right)) + 1;
        let id = self.push(NodeKind::Triple(Triple {
            left,
            boolean,
            right,
        }));
        self.nodes[id.0].height = height;
        self.nodes[left.0].parent = Some(id);
        self.nodes[right.0].parent = Some(id);
        id
    }

    /// Returns the number of nested triples under and including `id`.
    pub fn height(&self, id: NodeId) -> usize {
        self.nodes[id.0].height
    }

    /// Attaches prefixes declared in front of an already built node.
    pub fn add_prefixes(&mut self, id: NodeId, prefixes: PrefixMap) -> Result<(), Diagnostic> {
        for (name, uri) in prefixes {
            self.add_prefix(id, name, uri)?;
        }
        Ok(())
    }

    /// Attaches one prefix, rejecting reserved names in strict mode.
    ///
    /// A later binding replaces an earlier one. Prefixes are attached innermost first, so
    /// `>dc=outer (>dc=inner ...)` leaves `outer` on the shared node. Repeats inside one
    /// declaration group are the caller's to reject.
    pub fn add_prefix(&mut self, id: NodeId, name: String, uri: String) -> Result<(), Diagnostic> {
        if self.config.error_on_duplicate_prefix && reserved_prefix(&name).is_some() {
            return Err(Diagnostic::new(DiagnosticKind::DuplicatePrefix, name));
        }
        debug!(name = %name, uri = %uri, "prefix");
        self.nodes[id.0].prefixes.insert(name, uri);
        Ok(())
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &'c ParserConfig {
        self.config
    }

    /// Finishes the tree with `root` as its top node.
    pub fn finish(self, root: NodeId) -> Query {
        Query {
            nodes: self.nodes,
            root,
            config: self.config.clone(),
        }
    }

    /// Appends a node without a parent.
    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            kind,
            prefixes: PrefixMap::new(),
            parent: None,
            height: 0,
        });
        NodeId(self.nodes.len() - 1)
    }
}

/// Returns true if `s` is wrapped in a matching pair of double quotes.
pub fn is_quoted(s: &str) -> bool {
    s.len() >= 2 && s.starts_with('"') && s.ends_with('"')
}

/// Strips surrounding double quotes and unescapes `\"`. Unquoted input is returned as is.
pub fn unquote(s: &str) -> String {
    if is_quoted(s) {
        s[1..s.len() - 1].replace("\\\"", "\"")
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ParserConfig {
        ParserConfig::default()
    }

    fn clause(term: &str) -> SearchClause {
        SearchClause::server_choice(Term::parse(term, &config()).unwrap(), &config())
    }

    #[test]
    fn prefixed_name_splits_and_lowercases() {
        let name = PrefixedName::parse("DC.Title", &config()).unwrap();
        assert_eq!(name.prefix(), Some("dc"));
        assert_eq!(name.value(), "title");
        assert_eq!(name.full_name(), "dc.title");
    }

    #[test]
    fn prefixed_name_without_prefix() {
        let name = PrefixedName::parse("Any", &config()).unwrap();
        assert_eq!(name.prefix(), None);
        assert_eq!(name.value(), "any");
    }

    #[test]
    fn prefixed_name_unwraps_quotes() {
        let name = PrefixedName::parse("\"dc.title\"", &config()).unwrap();
        assert_eq!(name.full_name(), "dc.title");
    }

    #[test]
    fn quoted_identifier_rejected_in_strict_mode() {
        let strict = ParserConfig {
            error_on_quoted_identifier: true,
            ..ParserConfig::default()
        };
        let err = PrefixedName::parse("\"dc.title\"", &strict).unwrap_err();
        assert_eq!(err.code(), 14);
    }

    #[test]
    fn malformed_index_names() {
        assert_eq!(
            PrefixedName::parse("a.b.c", &config()).unwrap_err().code(),
            15
        );
        let err = PrefixedName::parse(".foo", &config()).unwrap_err();
        assert_eq!(err.code(), 15);
        assert!(err.details.contains("Null indexset"));
    }

    #[test]
    fn term_unquotes_and_unescapes() {
        let term = Term::parse(r#""say \"hi\"""#, &config()).unwrap();
        assert_eq!(term.value(), "say \"hi\"");
    }

    #[test]
    fn term_keeps_masking_escapes() {
        let term = Term::parse(r#""a\*b\\""#, &config()).unwrap();
        assert_eq!(term.value(), r"a\*b\\");
    }

    #[test]
    fn term_rejects_bad_escape() {
        let err = Term::parse(r"a\b", &config()).unwrap_err();
        assert_eq!(err.code(), 26);
        assert_eq!(Term::parse(r"ab\", &config()).unwrap_err().code(), 26);
    }

    #[test]
    fn term_rejects_bare_operators() {
        for op in BARE_OPERATORS {
            assert_eq!(Term::parse(op, &config()).unwrap_err().code(), 25);
        }
        assert_eq!(Term::parse("\">=\"", &config()).unwrap().value(), ">=");
    }

    #[test]
    fn term_rejects_anchor_only() {
        assert_eq!(Term::parse("^^^", &config()).unwrap_err().code(), 32);
        assert_eq!(Term::parse("\"^\"", &config()).unwrap_err().code(), 32);
        assert_eq!(Term::parse("^a^", &config()).unwrap().value(), "^a^");
    }

    #[test]
    fn empty_term_depends_on_strictness() {
        assert_eq!(Term::parse("\"\"", &config()).unwrap().value(), "");
        let strict = ParserConfig {
            error_on_empty_term: true,
            ..ParserConfig::default()
        };
        assert_eq!(Term::parse("\"\"", &strict).unwrap_err().code(), 27);
    }

    #[test]
    fn boolean_keywords() {
        assert_eq!(BooleanOp::from_keyword("AND"), Some(BooleanOp::And));
        assert_eq!(BooleanOp::from_keyword("Prox"), Some(BooleanOp::Prox));
        assert_eq!(BooleanOp::from_keyword("xor"), None);
        assert_eq!("nor".parse::<BooleanOp>().unwrap_err().code(), 37);
    }

    #[test]
    fn relation_comparison() {
        let relation = Relation::new(PrefixedName::new(None, ">="));
        assert_eq!(relation.comparison(), Some(Comparison::Ge));
        let keyword = Relation::new(PrefixedName::new(None, "any"));
        assert_eq!(keyword.comparison(), None);
    }

    #[test]
    fn modifier_lookup() {
        let mut relation = Relation::new(PrefixedName::new(None, "="));
        relation.modifiers.push(ModifierClause {
            name: PrefixedName::new(Some("cql"), "relevant"),
            comparison: None,
            value: None,
        });
        assert!(relation.modifier("relevant").is_some());
        assert!(relation.modifier("cql.relevant").is_some());
        assert!(relation.modifier("stem").is_none());
    }

    #[test]
    fn builder_links_parents() {
        let config = config();
        let mut builder = QueryBuilder::new(&config);
        let a = builder.push_clause(clause("a"));
        let b = builder.push_clause(clause("b"));
        let top = builder.push_triple(a, Boolean::new(BooleanOp::And), b);
        let query = builder.finish(top);

        assert_eq!(query.len(), 3);
        assert_eq!(query.node(a).parent().unwrap().id(), top);
        assert_eq!(query.node(b).parent().unwrap().id(), top);
        assert!(query.root().parent().is_none());
    }

    #[test]
    fn resolution_climbs_to_parent_then_defaults() {
        let mut config = config();
        config
            .default_prefixes
            .insert("bath".into(), "http://zing.z3950.org/cql/bath/2.0/".into());
        let mut builder = QueryBuilder::new(&config);
        let a = builder.push_clause(clause("a"));
        let b = builder.push_clause(clause("b"));
        let top = builder.push_triple(a, Boolean::new(BooleanOp::Or), b);
        builder
            .add_prefix(top, "dc".into(), "info:srw/cql-context-set/1/dc-v1.1".into())
            .unwrap();
        builder
            .add_prefix(a, "dc".into(), "http://purl.org/dc/elements/1.1/".into())
            .unwrap();
        let query = builder.finish(top);

        assert_eq!(
            query.node(a).resolve_prefix("dc"),
            Some("http://purl.org/dc/elements/1.1/")
        );
        assert_eq!(
            query.node(b).resolve_prefix("dc"),
            Some("info:srw/cql-context-set/1/dc-v1.1")
        );
        assert_eq!(
            query.node(b).resolve_prefix("bath"),
            Some("http://zing.z3950.org/cql/bath/2.0/")
        );
        assert_eq!(query.node(b).resolve_prefix("cql"), Some(CQL_CONTEXT_SET));
        assert_eq!(query.node(b).resolve_prefix("unknown"), None);
    }

    #[test]
    fn strict_mode_rejects_reserved_prefix() {
        let config = ParserConfig {
            error_on_duplicate_prefix: true,
            ..ParserConfig::default()
        };
        let mut builder = QueryBuilder::new(&config);
        let a = builder.push_clause(clause("a"));
        builder.add_prefix(a, "dc".into(), "x".into()).unwrap();
        builder.add_prefix(a, "dc".into(), "y".into()).unwrap();
        let err = builder.add_prefix(a, "cql".into(), "y".into()).unwrap_err();
        assert_eq!(err.code(), 45);
        assert_eq!(err.details, "cql");
        let query = builder.finish(a);
        assert_eq!(query.root().resolve_prefix("dc"), Some("y"));
    }

    #[test]
    fn lenient_duplicate_prefix_takes_latest() {
        let config = config();
        let mut builder = QueryBuilder::new(&config);
        let a = builder.push_clause(clause("a"));
        builder.add_prefix(a, "dc".into(), "x".into()).unwrap();
        builder.add_prefix(a, "dc".into(), "y".into()).unwrap();
        let query = builder.finish(a);
        assert_eq!(query.root().resolve_prefix("dc"), Some("y"));
    }

    #[test]
    fn unquote_helper() {
        assert_eq!(unquote("\"a\\\"b\""), "a\"b");
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(unquote("\""), "\"");
    }
}
