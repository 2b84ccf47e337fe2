//! Envelope Gateway Library
//!
//! An interception layer for an HTTP gateway: ordered global filters that
//! capture request bodies, rewrite backend responses into a uniform
//! `{code, msg, data}` envelope, and map failures to JSON error bodies.

pub mod backend;
pub mod config;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use config::schema::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use gateway::Gateway;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
