//! Parser and syntax tree for the Common Query Language (CQL).
//!
//! CQL expresses structured search requests:
//!
//! - **Terms**: `fish` - searched under the server's choice of index
//! - **Clauses**: `dc.title any "old man"` - index, relation, term
//! - **Booleans**: `a and b or c` - `and`, `or`, `not`, `prox`, folded left to right
//! - **Grouping**: `a or (b and c)` - parentheses control shape
//! - **Modifiers**: `title =/relevant x`, `a prox/unit=word b`
//! - **Prefixes**: `>dc="http://purl.org/dc/elements/1.1/" dc.title = x` - context sets
//!
//! A parsed [`Query`] renders back to canonical CQL and to XCQL, its XML form, and
//! [`xmlparse`] reads XCQL back into an equivalent tree.
//!
//! # Example
//!
//! ```
//! use cql_parser::{AstNode, parse, xmlparse};
//!
//! let query = parse("dc.title any fish and dc.date > 1999").unwrap();
//! assert_eq!(
//!     query.to_cql(),
//!     "(dc.title any \"fish\" and dc.date > \"1999\")"
//! );
//!
//! let again = xmlparse(&query.to_xcql(0)).unwrap();
//! assert!(query.structurally_eq(&again));
//! ```

#![warn(missing_docs)]

mod ast;
mod config;
mod error;
mod lexer;
mod parser;
mod serialize;
mod xcql;

pub use ast::{
    AstNode, Boolean, BooleanOp, Index, ModifierClause, NodeId, NodeKind, NodeRef, NodeView,
    PrefixedName, Query, Relation, SearchClause, Term, Triple,
};
pub use config::{
    CQL_CONTEXT_SET, CqlVersion, DEFAULT_MAX_DEPTH, ParserConfig, PrefixMap, RESERVED_PREFIXES,
    SERVER_CHOICE_INDEX, SRW_CONTEXT_SET, reserved_prefix,
};
pub use error::{Diagnostic, DiagnosticKind};
pub use lexer::{Comparison, Lexer, Token, TokenKind, tokenize};
pub use parser::{parse, parse_with};
pub use xcql::{xmlparse, xmlparse_with};
