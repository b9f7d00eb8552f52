//! RWA Launchpad API server.
//!
//! Serves payment verification, access evaluation, dashboard listings, and
//! the externally-triggered expiry sweep over HTTP. Configuration comes
//! from the environment and is validated before the listener starts; a
//! missing data-service URL or key aborts startup.

use std::sync::Arc;

use tracing::info;

use rwa_launchpad::LaunchpadConfig;
use rwa_launchpad::billing::DataServiceStore;
use rwa_launchpad::chain::HttpRpc;
use rwa_launchpad_server::{AppState, LogFormat, init_observability, router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_observability(LogFormat::from_env());

    let config = LaunchpadConfig::from_env()?;
    let store = Arc::new(DataServiceStore::new(&config.data_service)?);
    let rpc = Arc::new(HttpRpc::new(&config.chain.rpc_url)?);
    let state = Arc::new(AppState::new(store, rpc, config.chain.payments_address()?)?);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(%bind_addr, "launchpad server listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
