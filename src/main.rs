use anyhow::{Context, Result};
use clap::Parser;
use kitchen_sim::cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    // The subscriber writes to stderr, which would bleed through the TUI's
    // alternate screen; only headless modes get logging.
    if args.json || args.text || args.list {
        init_tracing()?;
    }

    cli::run(args).await
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}
