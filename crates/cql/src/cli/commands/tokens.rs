//! Implementation of `cql tokens`.

use std::process::ExitCode;

use comfy_table::{Cell, Table, presets::UTF8_FULL_CONDENSED};
use cql_parser::tokenize;

use crate::cli::{args::TokensCommand, output::report_diagnostic};

/// Prints the lexer's token stream as a table.
pub fn run(cmd: &TokensCommand) -> ExitCode {
    let tokens = match tokenize(&cmd.query) {
        Ok(tokens) => tokens,
        Err(diagnostic) => {
            report_diagnostic(&diagnostic);
            return ExitCode::FAILURE;
        }
    };

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Kind", "Text", "Position"]);
    for token in tokens.iter().filter(|t| !t.is_end()) {
        table.add_row(vec![
            Cell::new(format!("{:?}", token.kind)),
            Cell::new(&token.text),
            Cell::new(token.position),
        ]);
    }
    println!("{table}");
    ExitCode::SUCCESS
}
