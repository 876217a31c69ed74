use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    run::{self, RunArgs},
    version::{self, VersionArgs},
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod chains;
mod commands;
mod config;

#[derive(Parser, Debug)]
#[command(name = "impact-sim", about = "Micro-impact inference sampler CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate an observation and sample its impacts, or resume a run.
    Run(RunArgs),
    /// Print the crate version.
    Version(VersionArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run::run(&args),
        Command::Version(args) => version::run(&args),
    }
}
