//! # Fleetlink User Service HTTP API
//!
//! The upstream HTTP surface of the user service. The vehicle endpoints
//! await the core bridge's future and translate its failures into HTTP
//! statuses; `/health` reflects the response dispatcher's readiness so an
//! orchestrator can restart a service whose dispatcher never subscribed.

pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod server;

use std::sync::Arc;

use fleetlink_core::event::MemoryBus;
use server::{ServerConfig, start_server};

/// Initialize tracing from `RUST_LOG`, falling back to the given level.
pub fn init_tracing(default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Start the server with default configuration on an in-process bus.
pub async fn start() -> anyhow::Result<()> {
    start_with_config(ServerConfig::default()).await
}

/// Start the server with the given configuration on an in-process bus.
///
/// Deployments wiring a real broker construct their own bus and call
/// [`server::start_server`] directly.
pub async fn start_with_config(config: ServerConfig) -> anyhow::Result<()> {
    let bus = Arc::new(MemoryBus::new(config.bridge.bus_capacity));
    start_server(config, bus).await
}
