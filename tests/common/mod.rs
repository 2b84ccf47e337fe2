//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::RawQuery,
    http::StatusCode,
    routing::{any, get},
    Router,
};
use envelope_gateway::config::{GatewayConfig, RouteConfig};
use envelope_gateway::http::HttpServer;
use envelope_gateway::lifecycle::Shutdown;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

/// Start a raw mock backend that returns a fixed 200 response.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let response_str = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    response.len(),
                    response
                );
                let _ = socket.write_all(response_str.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start an upstream with a few behaviours:
///
/// - `/echo`: returns the request body unchanged
/// - `/query`: returns the raw query string
/// - `/fixed`: returns `{"y":2}`
/// - `/large/{n}`: returns `n` bytes of `a`
/// - `/status/{code}`: returns the status with body `status`
pub async fn start_upstream() -> SocketAddr {
    let app = Router::new()
        .route("/echo", any(|body: Bytes| async move { body }))
        .route(
            "/query",
            get(|RawQuery(query): RawQuery| async move { query.unwrap_or_default() }),
        )
        .route("/fixed", any(|| async { r#"{"y":2}"# }))
        .route(
            "/large/{n}",
            get(|axum::extract::Path(n): axum::extract::Path<usize>| async move {
                "a".repeat(n)
            }),
        )
        .route(
            "/status/{code}",
            get(|axum::extract::Path(code): axum::extract::Path<u16>| async move {
                (
                    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                    "status",
                )
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Gateway config with a single catch-all route to `upstream`.
pub fn config_for(upstream: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.routes.push(RouteConfig {
        name: "upstream".into(),
        host: None,
        path_prefix: Some("/".into()),
        upstream: upstream.to_string(),
        priority: 0,
    });
    config
}

/// A running gateway bound to an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    handle: tokio::task::JoinHandle<()>,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server task to finish.
    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
    }
}

pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestGateway {
        addr,
        shutdown,
        handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
