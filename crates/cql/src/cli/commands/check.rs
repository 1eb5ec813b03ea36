//! Implementation of `cql check`.

use std::process::ExitCode;

use cql_parser::parse_with;

use crate::cli::{
    args::CheckCommand,
    context::CommandContext,
    output::{dim, error, highlight_query, queries_or_stdin, report_diagnostic, success},
};

/// Parses each query without printing it, reporting `ok` or the diagnostic.
pub fn run(ctx: &CommandContext, cmd: &CheckCommand) -> ExitCode {
    let queries = match queries_or_stdin(&cmd.queries) {
        Ok(queries) => queries,
        Err(code) => return code,
    };

    let mut failed = 0;
    for input in &queries {
        match parse_with(input, &ctx.parser) {
            Ok(_) => println!("{} {}", success("ok"), highlight_query(input)),
            Err(diagnostic) => {
                failed += 1;
                println!("{} {input}", error("fail"));
                report_diagnostic(&diagnostic);
            }
        }
    }

    if queries.len() > 1 {
        println!();
        println!(
            "{}",
            dim(&format!("{} checked, {failed} failed", queries.len()))
        );
    }

    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
