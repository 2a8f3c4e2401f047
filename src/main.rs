//! Stackfold - Main Entry Point

use clap::Parser;
use stackfold::cli::{cmd_info, cmd_run, Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stackfold=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info { data, config } => cmd_info(&data, config.as_deref())?,
        Commands::Run(args) => cmd_run(&args)?,
    }

    Ok(())
}
