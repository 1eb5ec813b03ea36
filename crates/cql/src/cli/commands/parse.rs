//! Implementation of `cql parse`.

use std::process::ExitCode;

use cql_parser::parse_with;

use crate::cli::{
    args::ParseCommand,
    context::CommandContext,
    output::{print_query, queries_or_stdin, report_diagnostic},
};

/// Parses each query and prints it in the requested format.
///
/// Every query is attempted; the exit status fails if any of them did.
pub fn run(ctx: &CommandContext, cmd: &ParseCommand) -> ExitCode {
    let queries = match queries_or_stdin(&cmd.queries) {
        Ok(queries) => queries,
        Err(code) => return code,
    };
    if queries.is_empty() {
        eprintln!("error: no query given");
        return ExitCode::FAILURE;
    }

    let format = cmd.format.format();
    let mut status = ExitCode::SUCCESS;
    for input in &queries {
        match parse_with(input, &ctx.parser) {
            Ok(query) => {
                if let Err(code) = print_query(input, &query, format) {
                    return code;
                }
            }
            Err(diagnostic) => {
                report_diagnostic(&diagnostic);
                status = ExitCode::FAILURE;
            }
        }
    }
    status
}
