//! Cartograph CLI - Navigation and route composition engine.
//!
//! Provides commands for:
//! - `build`: Compose the site map and write it as JSON
//! - `check`: Compose the site map and report diagnostics only
//! - `watch`: Build, then rebuild incrementally on source changes

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, CheckArgs, WatchArgs};
use output::Output;

/// Cartograph - Navigation and route composition engine.
#[derive(Parser)]
#[command(name = "cartograph", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the site map and write it to the output file.
    Build(BuildArgs),
    /// Build the site map without writing output.
    Check(CheckArgs),
    /// Build, then rebuild whenever sources change.
    Watch(WatchArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Build(args) => args.common.verbose,
            Self::Check(args) => args.common.verbose,
            Self::Watch(args) => args.common.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Build(args) => args.execute(),
        Commands::Check(args) => args.execute(),
        Commands::Watch(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
