//! CQL parser.
//!
//! Builds a [`Query`] from the token stream using recursive descent with one token of
//! lookahead beyond the current one.
//!
//! # Grammar
//!
//! ```text
//! query     → prefixes sub_query (boolean sub_query)*
//! sub_query → "(" query ")" | prefixes query | clause
//! clause    → index relation term | term | ">" prefixes clause
//! boolean   → ("and" | "or" | "not" | "prox") modifiers
//! relation  → relation_word modifiers
//! modifiers → ("/" modifier_type (comparison value)?)*
//! prefixes  → (">" (name "=")? identifier)*
//! ```
//!
//! Booleans all share one precedence level and fold left to right, so `a and b or c`
//! parses as `((a and b) or c)`. Parentheses are the only way to change grouping.

use std::{collections::BTreeSet, mem};

use crate::{
    ast::{
        Boolean, BooleanOp, ModifierClause, NodeId, PrefixedName, Query, QueryBuilder, Relation,
        SearchClause, Term, unquote,
    },
    config::{ParserConfig, PrefixMap},
    error::{Diagnostic, DiagnosticKind},
    lexer::{Lexer, Token, TokenKind},
};

/// Recursive descent parser over a lazily lexed token stream.
struct Parser<'a, 'c> {
    /// Token source.
    lexer: Lexer<'a>,
    /// Token being examined.
    current: Token,
    /// One token of lookahead.
    next: Token,
    /// Arena under construction.
    builder: QueryBuilder<'c>,
    /// Current sub-query nesting depth.
    depth: usize,
}

impl<'a, 'c> Parser<'a, 'c> {
    /// Creates a parser and primes both lookahead slots.
    fn new(input: &'a str, config: &'c ParserConfig) -> Result<Self, Diagnostic> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        let next = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            next,
            builder: QueryBuilder::new(config),
            depth: 0,
        })
    }

    /// Parses a complete query and checks that all input was consumed.
    fn parse(mut self) -> Result<Query, Diagnostic> {
        let root = self.query()?;

        match self.current.kind {
            TokenKind::End => Ok(self.builder.finish(root)),
            TokenKind::RParen => Err(Diagnostic::new(
                DiagnosticKind::Parenthesis,
                format!("Unbalanced ')' at offset {}", self.current.position),
            )),
            _ => Err(Diagnostic::syntax(format!(
                "Unprocessed tokens remain: {}",
                self.current.text
            ))),
        }
    }

    /// Parses: query → prefixes sub_query (boolean sub_query)*
    fn query(&mut self) -> Result<NodeId, Diagnostic> {
        self.enter()?;
        let prefixes = self.prefixes()?;
        let mut left = self.sub_query()?;

        while self.at_boolean() {
            let boolean = self.boolean()?;
            let right = self.sub_query()?;
            left = self.builder.push_triple(left, boolean, right);
            let limit = self.builder.config().max_depth;
            if self.builder.height(left) > limit {
                return Err(Diagnostic::too_deep(limit));
            }
        }

        self.builder.add_prefixes(left, prefixes)?;
        self.depth -= 1;
        Ok(left)
    }

    /// Parses: sub_query → "(" query ")" | prefixes query | clause
    fn sub_query(&mut self) -> Result<NodeId, Diagnostic> {
        if self.current.kind == TokenKind::LParen {
            self.advance()?;
            let node = self.query()?;
            if self.current.kind != TokenKind::RParen {
                return Err(Diagnostic::new(
                    DiagnosticKind::Parenthesis,
                    describe(&self.current),
                ));
            }
            self.advance()?;
            return Ok(node);
        }

        let prefixes = self.prefixes()?;
        if prefixes.is_empty() {
            self.clause()
        } else {
            let node = self.query()?;
            self.builder.add_prefixes(node, prefixes)?;
            Ok(node)
        }
    }

    /// Parses a search clause, explicit or implicit.
    fn clause(&mut self) -> Result<NodeId, Diagnostic> {
        let next_ends_clause = is_boolean(&self.next)
            || matches!(
                self.next.kind,
                TokenKind::LParen | TokenKind::RParen | TokenKind::End
            );

        if self.current.is_comparison(">") {
            let prefixes = self.prefixes()?;
            let node = self.clause()?;
            self.builder.add_prefixes(node, prefixes)?;
            Ok(node)
        } else if !next_ends_clause {
            self.explicit_clause()
        } else if !self.current.is_end() && self.next.kind != TokenKind::LParen {
            let term = self.term()?;
            let clause = SearchClause::server_choice(term, self.builder.config());
            Ok(self.builder.push_clause(clause))
        } else {
            Err(Diagnostic::syntax(format!(
                "Expected Boolean or Relation but got: {}",
                self.current.text
            )))
        }
    }

    /// Parses: index relation term
    fn explicit_clause(&mut self) -> Result<NodeId, Diagnostic> {
        if !matches!(self.current.kind, TokenKind::Word | TokenKind::Quoted) {
            return Err(Diagnostic::syntax(format!(
                "Expected index, got: {}",
                describe(&self.current)
            )));
        }
        let index = PrefixedName::parse(&self.advance()?.text, self.builder.config())?;
        let relation = self.relation()?;
        if self.current.is_end() {
            return Err(Diagnostic::syntax("Expected Term, got end of query."));
        }
        let term = self.term()?;
        Ok(self.builder.push_clause(SearchClause {
            index,
            relation,
            term,
        }))
    }

    /// Parses: relation → relation_word modifiers
    fn relation(&mut self) -> Result<Relation, Diagnostic> {
        if !matches!(
            self.current.kind,
            TokenKind::Word | TokenKind::Quoted | TokenKind::Comparison
        ) {
            return Err(Diagnostic::syntax(format!(
                "Expected relation, got: {}",
                describe(&self.current)
            )));
        }
        let name = PrefixedName::parse(&self.advance()?.text, self.builder.config())?;
        Ok(Relation {
            name,
            modifiers: self.modifiers()?,
        })
    }

    /// Consumes the current token as a term.
    fn term(&mut self) -> Result<Term, Diagnostic> {
        match self.current.kind {
            TokenKind::LParen | TokenKind::RParen | TokenKind::End => Err(Diagnostic::syntax(
                format!("Expected term, got: {}", describe(&self.current)),
            )),
            _ => {
                let token = self.advance()?;
                Term::parse(&token.text, self.builder.config())
            }
        }
    }

    /// Parses: boolean → keyword modifiers
    fn boolean(&mut self) -> Result<Boolean, Diagnostic> {
        let op = match self.current.kind {
            TokenKind::Word => BooleanOp::from_keyword(&self.current.text),
            _ => None,
        }
        .ok_or_else(|| Diagnostic::new(DiagnosticKind::ExpectedBoolean, describe(&self.current)))?;
        self.advance()?;
        Ok(Boolean {
            op,
            modifiers: self.modifiers()?,
        })
    }

    /// Parses: modifiers → ("/" modifier_type (comparison value)?)*
    fn modifiers(&mut self) -> Result<Vec<ModifierClause>, Diagnostic> {
        let mut modifiers = Vec::new();
        while self.current.kind == TokenKind::Slash {
            self.advance()?;
            if !matches!(self.current.kind, TokenKind::Word | TokenKind::Quoted) {
                return Err(Diagnostic::new(
                    DiagnosticKind::NullModifier,
                    format!("Null modifier: {}", describe(&self.current)),
                ));
            }
            let name = PrefixedName::parse(&self.advance()?.text, self.builder.config())?;

            let (comparison, value) = if self.current.kind == TokenKind::Comparison {
                let comparison = self.advance()?.text.parse().ok();
                if !matches!(self.current.kind, TokenKind::Word | TokenKind::Quoted) {
                    return Err(Diagnostic::new(
                        DiagnosticKind::NullModifier,
                        format!("Missing value for modifier {name}"),
                    ));
                }
                (comparison, Some(unquote(&self.advance()?.text)))
            } else {
                (None, None)
            };

            modifiers.push(ModifierClause {
                name,
                comparison,
                value,
            });
        }
        Ok(modifiers)
    }

    /// Parses: prefixes → (">" (name "=")? identifier)*
    fn prefixes(&mut self) -> Result<PrefixMap, Diagnostic> {
        let strict = self.builder.config().error_on_duplicate_prefix;
        let mut prefixes = PrefixMap::new();
        let mut declared = BTreeSet::new();

        while self.current.is_comparison(">") {
            self.advance()?;
            let name = if self.next.is_comparison("=") {
                if !matches!(self.current.kind, TokenKind::Word | TokenKind::Quoted) {
                    return Err(Diagnostic::syntax(format!(
                        "Expected prefix name, got: {}",
                        describe(&self.current)
                    )));
                }
                let name = unquote(&self.advance()?.text);
                self.advance()?;
                name
            } else {
                String::new()
            };

            if !matches!(self.current.kind, TokenKind::Word | TokenKind::Quoted) {
                return Err(Diagnostic::syntax(format!(
                    "Expected prefix identifier, got: {}",
                    describe(&self.current)
                )));
            }
            let identifier = unquote(&self.advance()?.text);

            if strict && declared.contains(&name) {
                return Err(Diagnostic::new(DiagnosticKind::DuplicatePrefix, name));
            }
            prefixes.insert(name.to_lowercase(), identifier);
            declared.insert(name);
        }
        Ok(prefixes)
    }

    /// Returns true if the current token is a boolean keyword.
    fn at_boolean(&self) -> bool {
        is_boolean(&self.current)
    }

    /// Steps into a nested query, enforcing the depth limit.
    fn enter(&mut self) -> Result<(), Diagnostic> {
        let limit = self.builder.config().max_depth;
        if self.depth >= limit {
            return Err(Diagnostic::too_deep(limit));
        }
        self.depth += 1;
        Ok(())
    }

    /// Shifts `next` into `current`, pulls a new token, and returns the old current.
    fn advance(&mut self) -> Result<Token, Diagnostic> {
        let pulled = self.lexer.next_token()?;
        let next = mem::replace(&mut self.next, pulled);
        Ok(mem::replace(&mut self.current, next))
    }
}

/// Returns true if `token` is a bare boolean keyword.
fn is_boolean(token: &Token) -> bool {
    token.kind == TokenKind::Word && BooleanOp::from_keyword(&token.text).is_some()
}

/// Names a token for error details.
fn describe(token: &Token) -> String {
    if token.is_end() {
        "end of query".to_string()
    } else {
        token.text.clone()
    }
}

/// Parses a CQL query with the default configuration.
pub fn parse(input: &str) -> Result<Query, Diagnostic> {
    parse_with(input, &ParserConfig::default())
}

/// Parses a CQL query with an explicit configuration.
pub fn parse_with(input: &str, config: &ParserConfig) -> Result<Query, Diagnostic> {
    Parser::new(input, config)?.parse()
}
