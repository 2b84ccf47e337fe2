//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start the metrics endpoint when enabled
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The filter chain is built before the listener binds
//! - Listener starts last (traffic only when ready)

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_listener;
use crate::observability::metrics;

/// Bring the gateway up and serve until a termination signal arrives.
pub async fn run(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        request_capture = config.filters.request_capture,
        response_wrap = config.filters.response_wrap,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    spawn_signal_listener(shutdown);

    server.run(listener, server_shutdown).await?;
    Ok(())
}
