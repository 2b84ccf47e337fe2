//! Backend invocation subsystem.
//!
//! # Data Flow
//! ```text
//! FilterChain terminal step
//!     → Backend::invoke(request)
//!     → http.rs (route lookup, upstream call with deadline)
//!     → Response<Body> or GatewayError
//! ```
//!
//! # Design Decisions
//! - The chain only sees the `Backend` trait; routing and transport stay
//!   behind it
//! - Failures carry enough shape for classification (route miss, status,
//!   anything else)

pub mod http;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;

use crate::error::GatewayResult;

pub use http::HttpBackend;

/// The routed call sitting behind the filter chain.
pub trait Backend: Send + Sync + 'static {
    fn invoke(&self, request: Request<Body>) -> BoxFuture<'_, GatewayResult<Response<Body>>>;
}
