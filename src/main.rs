//! Tapewarp CLI entry point

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tapewarp::cli::{commands, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Process(args) => commands::process(&args),
        Commands::Bpm { input } => commands::bpm(&input),
        Commands::Info { input } => commands::info(&input),
    }
}
