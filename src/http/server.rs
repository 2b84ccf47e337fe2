//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the gateway handler
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener
//! - Hand every request to the `Gateway`
//! - Stop accepting on shutdown and drain in-flight requests
//!
//! # Design Decisions
//! - The request deadline is enforced inside `Gateway`, not as a tower layer,
//!   so expiry is rendered by the error envelope mapper

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::backend::HttpBackend;
use crate::config::GatewayConfig;
use crate::error::GatewayResult;
use crate::gateway::Gateway;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::observability::metrics;
use crate::routing::Router as RouteTable;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Build the server with the HTTP upstream backend described by the
    /// configured routes.
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let routes = RouteTable::from_config(&config.routes)?;
        let backend = HttpBackend::new(routes, Duration::from_secs(config.timeouts.upstream_secs));
        let gateway = Gateway::from_config(&config, Arc::new(backend))?;
        Ok(Self::with_gateway(config, gateway))
    }

    /// Build the server around an already assembled gateway.
    pub fn with_gateway(config: GatewayConfig, gateway: Gateway) -> Self {
        let state = AppState {
            gateway: Arc::new(gateway),
        };
        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer()),
            )
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.config.routes.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Hands the request to the gateway and records the outcome.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let response = state.gateway.handle(request).await;

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}
