mod cli;
mod commands;
mod config;
mod render;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::{cli::Cli, commands::Console};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let settings = config::load_settings(cli.config.as_deref())?;
    tracing::debug!(gateway = %settings.gateway_url, state_dir = %settings.state_dir.display(), "settings loaded");

    let console = Console::new(settings, cli.json)?;
    console.run(cli.command).await
}
