//! Command implementations and dispatch.

pub mod check;
pub mod config;
pub mod matching;
pub mod tree;

use std::process::ExitCode;

use super::{args::Commands, context::CommandContext};

/// Dispatches to the selected subcommand.
pub fn run(command: Commands, ctx: &CommandContext) -> ExitCode {
    match command {
        Commands::Match(cmd) => matching::run(ctx, &cmd),
        Commands::Tree(cmd) => tree::run(ctx, &cmd),
        Commands::Check => check::run(ctx),
        Commands::Config => config::run(ctx),
    }
}
