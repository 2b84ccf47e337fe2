//! Gateway failure taxonomy.
//!
//! Every failure raised inside the filter chain, by the backend collaborator
//! or by the body buffer travels up the chain as a [`GatewayError`] and is
//! classified by the error envelope mapper (`http::response`).

use axum::http::StatusCode;
use thiserror::Error;

/// Failures produced while processing a single exchange.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No route matched the request.
    #[error("no route matches path {path}")]
    RouteNotFound { path: String },

    /// A failure that carries its own HTTP status and message.
    #[error("{status}: {message}")]
    Status { status: StatusCode, message: String },

    /// The underlying body stream failed mid-read.
    #[error("failed to read body stream: {0}")]
    StreamRead(#[source] axum::Error),

    /// The body exceeded the configured capture limit.
    #[error("body exceeds capture limit of {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// Envelope construction or serialization failed.
    #[error("failed to serialize envelope: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The upstream call failed before producing a response.
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// A write was attempted on a response that already started.
    #[error("response already committed")]
    ResponseCommitted,

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Shorthand for a status-carrying failure.
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        GatewayError::Status {
            status,
            message: message.into(),
        }
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::RouteNotFound { .. } => "route_not_found",
            GatewayError::Status { .. } => "status",
            GatewayError::StreamRead(_) => "stream_read",
            GatewayError::BodyTooLarge { .. } => "body_too_large",
            GatewayError::Serialization(_) => "serialization",
            GatewayError::Upstream(_) => "upstream",
            GatewayError::ResponseCommitted => "response_committed",
            GatewayError::Internal(_) => "internal",
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
