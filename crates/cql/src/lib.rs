//! cql: a command-line front end for the Common Query Language.
//!
//! Parses queries into canonical CQL or XCQL, reads XCQL back, shows the token stream the
//! lexer produces, and manages the `.cql.toml` files that configure the parser.

#![warn(missing_docs)]

pub mod cli;
