//! waystation server entry point.
//!
//! Loads configuration, opens the cache store, installs the configured
//! version and then serves the MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;
use waystation_client::{CacheArbiter, FetchClient, FetchConfig};
use waystation_core::{AppConfig, CacheDb};

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        version = %config.version_tag,
        origin = %config.origin,
        db_path = %config.db_path.display(),
        "Starting waystation on stdio transport"
    );

    let store = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig::from(&config))?;
    let arbiter = Arc::new(CacheArbiter::from_config(&config, Arc::new(store), Arc::new(network))?);

    // A failed install leaves the previous generation serving; tools can retry it.
    if let Err(e) = arbiter.on_install().await {
        tracing::error!(error = %e, "initial install failed");
    }

    let handler = handler::WaystationServer::new(arbiter);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
