//! Implementation of `sift check`.

use std::process::ExitCode;

use sift_config::{ConfigWarning, is_global_config};

use crate::cli::{
    context::CommandContext,
    output::{dim, subheader, warning},
};

/// Shows the loaded configuration files and validation warnings.
///
/// Exits with failure if there are warnings.
pub fn run(ctx: &CommandContext) -> ExitCode {
    if ctx.config_files.is_empty() {
        println!("{}", dim("No configuration files found, using defaults."));
    } else {
        println!("{}", subheader("Config files:"));
        for path in &ctx.config_files {
            let display = path.strip_prefix(&ctx.cwd).unwrap_or(path);
            if is_global_config(path) {
                println!("   {} {}", display.display(), dim("(global)"));
            } else {
                println!("   {}", display.display());
            }
        }
    }
    println!();

    let warnings = ctx.config.validate();
    if warnings.is_empty() {
        println!("No issues found.");
        return ExitCode::SUCCESS;
    }

    println!("{}", subheader(&format!("Warnings ({}):", warnings.len())));
    for w in &warnings {
        println!("   {}", warning(&w.to_string()));
    }
    println!();

    print_hints(&warnings);

    ExitCode::FAILURE
}

/// Prints hints for resolving common warnings.
fn print_hints(warnings: &[ConfigWarning]) {
    for w in warnings {
        match w {
            ConfigWarning::UnknownStemmer { .. } => {
                println!("{}", dim("Hint: monitor.stemmer takes a language name or \"none\""));
            }
            ConfigWarning::SinglePassMultipass => {
                println!("{}", dim("Hint: set presearcher.passes to 2 or more"));
            }
            _ => {}
        }
    }
}
