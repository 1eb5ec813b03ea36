//! Implementation of `cql config`.

use std::process::ExitCode;

use cql_config::ConfigWarning;
use cql_highlight::Highlighter;

use crate::cli::{
    context::CommandContext,
    output::{dim, rule, subheader, warning},
};

/// Shows the contributing config files, the effective settings and any warnings.
pub fn run(ctx: &CommandContext) -> ExitCode {
    let config = &ctx.config;

    if config.files.is_empty() {
        println!("{}", dim("No configuration files found."));
        println!("Run {} to create a configuration file.", subheader("cql init"));
    } else {
        println!("{}", subheader("Config files (highest precedence first):"));
        for path in &config.files {
            println!("   {}", path.display());
        }
    }
    println!();

    let toml = match config.settings_to_toml() {
        Ok(toml) => toml,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    println!("{}", subheader("Effective settings:"));
    println!("{}", rule(40));
    print!("{}", Highlighter::new().highlight_toml(&toml));
    println!("{}", rule(40));

    let warnings = config.validate();
    if warnings.is_empty() {
        return ExitCode::SUCCESS;
    }

    println!();
    println!("{}", subheader(&format!("Warnings ({}):", warnings.len())));
    for w in &warnings {
        println!("   {}", warning(&w.to_string()));
    }
    print_hints(&warnings);

    ExitCode::FAILURE
}

/// Prints hints for resolving common warnings.
fn print_hints(warnings: &[ConfigWarning]) {
    for w in warnings {
        let hint = match w {
            ConfigWarning::ReservedPrefixShadowed { .. } => {
                "Hint: 'cql' and 'srw' always resolve to their standard context sets"
            }
            ConfigWarning::EmptyPrefixIdentifier { .. } => {
                "Hint: give each [prefixes] entry a context set identifier"
            }
            ConfigWarning::ZeroMaxDepth => "Hint: remove parser.max_depth to use the default",
        };
        println!("{}", dim(hint));
    }
}
