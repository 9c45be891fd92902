//! Clap argument definitions for the `sift` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Top-level CLI options.
#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Reverse search: match documents against registered queries")]
pub struct Cli {
    /// Use this configuration file instead of discovering sift.toml files
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Log verbosity (-v for info, -vv for debug); RUST_LOG overrides
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Supported `sift` subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Register queries and match a document against them
    Match(MatchCommand),

    /// Show the presearch tree, indexed terms and decomposition of a query
    Tree(TreeCommand),

    /// Validate configuration and report warnings
    Check,

    /// Show the effective configuration
    Config,
}

/// Matcher used by `sift match`.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatcherKind {
    /// Report which queries matched
    #[default]
    Simple,
    /// Report the document score per query
    Scoring,
    /// Report the score and its explanation
    Explain,
    /// Report matching byte ranges per field
    Highlight,
}

/// Arguments for `sift match`.
#[derive(Args, Debug, Clone)]
pub struct MatchCommand {
    /// JSON file with an array of queries: [{"id", "query", "highlight"?, "metadata"?}]
    #[arg(short = 'q', long)]
    pub queries: PathBuf,

    /// JSON file with the document: {"id", "fields": {...}}
    #[arg(short = 'd', long)]
    pub document: PathBuf,

    /// Matcher to evaluate candidates with
    #[arg(short = 'm', long, value_enum, default_value_t = MatcherKind::Simple)]
    pub matcher: MatcherKind,

    /// Keep the presearch index in this directory instead of in memory
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `sift tree`.
#[derive(Args, Debug, Clone)]
pub struct TreeCommand {
    /// Query to explain
    pub query: String,
}
