#![recursion_limit = "256"]

use anyhow::Result;
use cell_classifier::cli::Cli;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("cell_classifier=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    cli.run()
}
