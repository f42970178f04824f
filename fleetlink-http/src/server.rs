use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use fleetlink_core::config::BridgeConfig;
use fleetlink_core::event::{
    BridgeMetrics, MessageBus, ResponseDispatcher, VehicleDataRequester,
};

use crate::routes::create_api_router;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Bridge configuration (topics, timeout, backoff)
    pub bridge: BridgeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            bridge: BridgeConfig::default(),
        }
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub requester: Arc<VehicleDataRequester>,
    pub dispatcher: Arc<ResponseDispatcher>,
    pub metrics: Arc<BridgeMetrics>,
}

impl AppState {
    /// Wires the bridge onto a bus and starts the response dispatcher.
    pub fn new(bus: Arc<dyn MessageBus>, config: &BridgeConfig) -> Self {
        let metrics = Arc::new(BridgeMetrics::default());
        let requester = Arc::new(VehicleDataRequester::new(
            bus.clone(),
            config,
            metrics.clone(),
        ));
        let dispatcher = Arc::new(ResponseDispatcher::new(
            bus,
            requester.registry(),
            metrics.clone(),
            config,
        ));
        dispatcher.spawn();
        Self {
            requester,
            dispatcher,
            metrics,
        }
    }
}

/// Start the HTTP server
pub async fn start_server(
    config: ServerConfig,
    bus: Arc<dyn MessageBus>,
) -> anyhow::Result<()> {
    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState::new(bus, &config.bridge);
    info!("Initialized bridge state");

    let app = create_api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = format!("{}:{}", config.host, config.port).parse::<SocketAddr>()?;

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
