//! HTTP edge of the people API: routes, configuration and serving.

pub mod api;
pub mod config;

pub use api::{router, AppState, SharedState};
pub use config::{Cli, ServerConfig};

use log::info;
use tokio::net::TcpListener;

/// Serves the people routes on an already bound listener until it fails.
pub async fn serve(listener: TcpListener, state: SharedState) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(
        "event=server_start module=server status=ok addr=http://{addr} core_version={}",
        swapi_core::core_version()
    );
    axum::serve(listener, router(state)).await?;
    Ok(())
}
