//! Solder CLI: the `solder` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    support::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::GraphCheck { spec, json } => commands::graph_check::run(spec, json),

        Commands::Plan {
            spec,
            component,
            json,
        } => commands::plan::run(spec, component, json),

        Commands::Resolve {
            spec,
            component,
            entries,
            use_async,
            json,
        } => commands::resolve::run(commands::resolve::Args {
            spec,
            component,
            entries,
            use_async,
            json,
        }),
    }
}
