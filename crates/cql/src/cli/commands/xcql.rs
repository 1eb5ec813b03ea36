//! Implementation of `cql xcql`.

use std::process::ExitCode;

use cql_parser::{AstNode, xmlparse_with};

use crate::cli::{
    args::XcqlCommand,
    context::CommandContext,
    output::{print_highlighted, read_input, report_diagnostic},
};

/// Reads an XCQL document and prints the query it describes.
pub fn run(ctx: &CommandContext, cmd: &XcqlCommand) -> ExitCode {
    let input = match read_input(cmd.file.as_deref()) {
        Ok(input) => input,
        Err(code) => return code,
    };

    match xmlparse_with(&input, &ctx.parser) {
        Ok(query) if cmd.xcql => {
            print_highlighted(&query.to_xcql(0), "xml");
            ExitCode::SUCCESS
        }
        Ok(query) => {
            println!("{}", query.to_cql());
            ExitCode::SUCCESS
        }
        Err(diagnostic) => {
            report_diagnostic(&diagnostic);
            ExitCode::FAILURE
        }
    }
}
