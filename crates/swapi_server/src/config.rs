//! Command-line configuration for the people API server.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use swapi_core::default_log_level;

#[derive(Parser, Debug)]
#[command(name = "swapi")]
#[command(version, about = "HTTP API over the people/vehicles/starships dataset")]
pub struct Cli {
    /// Path to the SQLite database file
    #[arg(short, long, default_value = "swapi.dat")]
    pub database: PathBuf,

    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files; logs go to stderr when unset
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Log every request and repository operation
    #[arg(long)]
    pub debug: bool,
}

/// Resolved server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub database: PathBuf,
    pub listen: SocketAddr,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// `--debug` wins over `--log-level`; without either the build-mode
    /// default applies.
    pub fn from_cli(cli: Cli) -> Self {
        let log_level = if cli.debug {
            "debug".to_string()
        } else {
            cli.log_level
                .unwrap_or_else(|| default_log_level().to_string())
        };

        Self {
            database: cli.database,
            listen: cli.listen,
            log_level,
            log_dir: cli.log_dir,
        }
    }
}
