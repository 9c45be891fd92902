//! Implementation of `sift tree`.

use std::process::ExitCode;

use sift_config::PresearcherKind;
use sift_monitor::{analyze_query, build_analyzer_from_name, build_presearcher};
use sift_presearch::{Metadata, MultipassPresearcher, QueryDecomposer, TreeAdvancer};
use sift_query::{ParseOptions, parse};

use crate::cli::{
    args::TreeCommand,
    context::CommandContext,
    output::{dim, header, subheader},
};

/// Prints how a query is analyzed, decomposed and indexed for presearch.
pub fn run(ctx: &CommandContext, cmd: &TreeCommand) -> ExitCode {
    let config = &ctx.config;
    let analyzer = match build_analyzer_from_name(&config.monitor.stemmer) {
        Ok(analyzer) => analyzer,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let options = ParseOptions::new(config.monitor.default_field.clone());
    let expr = match parse(&cmd.query, &options) {
        Ok(Some(expr)) => analyze_query(&expr, &analyzer),
        Ok(None) => {
            eprintln!("error: empty query");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let presearcher = build_presearcher(config, &analyzer);
    let parts = QueryDecomposer.decompose(&expr);

    println!("{}", header("Query"));
    print!("{expr}");
    println!();

    println!("{}", header(&format!("Disjuncts ({})", parts.len())));
    for (i, part) in parts.iter().enumerate() {
        println!("{}", subheader(&format!("[{i}]")));
        print!("{part}");

        let tree = presearcher.build_tree(part);
        println!("{}", dim("tree:"));
        print!("{tree}");

        if config.presearcher.kind == PresearcherKind::Multipass {
            let multipass = MultipassPresearcher::new(
                presearcher.builder().clone(),
                config.presearcher.passes,
                TreeAdvancer::MinWeight(config.presearcher.min_weight),
            );
            for (pass, terms) in multipass.pass_terms(&tree).iter().enumerate() {
                let terms: Vec<String> = terms.iter().map(ToString::to_string).collect();
                println!("{} {}", dim(&format!("pass {pass}:")), terms.join(" "));
            }
        }

        println!("{}", dim("indexed:"));
        for (field, term) in presearcher.index_query(&tree, &Metadata::new()).pairs() {
            println!("   {field}:{term}");
        }
        println!();
    }

    ExitCode::SUCCESS
}
