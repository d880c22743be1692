//! Server entry point.
//!
//! # Responsibility
//! - Parse flags, start logging, open the database and serve HTTP.

use anyhow::Context;
use clap::Parser;
use swapi_core::{init_console_logging, init_logging, open_db};
use swapi_server::{serve, AppState, Cli, ServerConfig};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_cli(Cli::parse());

    match &config.log_dir {
        Some(dir) => init_logging(&config.log_level, &dir.to_string_lossy()),
        None => init_console_logging(&config.log_level),
    }
    .map_err(anyhow::Error::msg)?;

    let db = open_db(&config.database)
        .with_context(|| format!("failed to open database {}", config.database.display()))?;
    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;

    serve(listener, AppState::shared(db)).await
}
