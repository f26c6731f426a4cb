use anyhow::Result;
use clap::Parser;

mod assemble;
mod audit;
mod autofix;
mod bib;
mod cli;
mod encoding;
mod error;
mod ident;
mod inventory;
mod latex;
mod links;
mod names;
mod normalize;
mod resolver;
mod rewrite;
mod store;
mod volume;
mod workflow;

use cli::{Command, RootArgs};

fn main() -> Result<()> {
    let cli = RootArgs::parse();
    init_tracing(&cli.command);

    match cli.command {
        Command::TidyUnicode(args) => workflow::run_tidy(&args),
        Command::Audit(args) => workflow::run_audit(&args),
        Command::Build(args) => workflow::run_build(&args),
    }
}

/// Diagnostics go to stderr so record and summary output stays clean.
/// `RUST_LOG` overrides the flag-derived default filter.
fn init_tracing(command: &Command) {
    let (verbose, quiet) = match command {
        Command::TidyUnicode(args) => (args.verbose, args.quiet),
        Command::Audit(args) => (args.verbose, args.quiet),
        Command::Build(args) => (args.verbose, args.quiet),
    };
    let default_filter = if quiet {
        "error"
    } else if verbose {
        "volpress=debug"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
