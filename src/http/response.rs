//! Failure-to-response mapping.
//!
//! # Responsibilities
//! - Classify a pipeline failure (route miss, status-carrying, anything else)
//! - Render the error envelope `{"code": <status>, "message": "..."}`
//! - Write it as the only response chunk with exact framing
//! - Refuse to write once the response is committed
//!
//! # Design Decisions
//! - Classification is a value returned to the caller, never ambient state
//! - First match wins: route miss → 404, carried status → verbatim, else 500
//! - Committed responses are left alone; the failure is handed back so the
//!   transport can abort the connection
//! - One log line per handled failure with path and cause

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};

use crate::envelope::{self, ErrorBody};
use crate::error::{GatewayError, GatewayResult};
use crate::filter::exchange::Exchange;
use crate::observability::metrics;

const JSON_UTF8: &str = "application/json;charset=UTF-8";

/// Classified shape of a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorClassification {
    RouteNotFound,
    StatusCarrying { status: StatusCode, message: String },
    Unclassified,
}

impl ErrorClassification {
    pub fn classify(error: &GatewayError) -> Self {
        match error {
            GatewayError::RouteNotFound { .. } => ErrorClassification::RouteNotFound,
            GatewayError::Status { status, message } => ErrorClassification::StatusCarrying {
                status: *status,
                message: message.clone(),
            },
            GatewayError::StreamRead(_)
            | GatewayError::BodyTooLarge { .. }
            | GatewayError::Serialization(_)
            | GatewayError::Upstream(_)
            | GatewayError::ResponseCommitted
            | GatewayError::Internal(_) => ErrorClassification::Unclassified,
        }
    }

    /// Label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorClassification::RouteNotFound => "route_not_found",
            ErrorClassification::StatusCarrying { .. } => "status_carrying",
            ErrorClassification::Unclassified => "unclassified",
        }
    }

    pub fn into_envelope(self) -> ErrorEnvelope {
        match self {
            ErrorClassification::RouteNotFound => {
                ErrorEnvelope::new(StatusCode::NOT_FOUND, "Service Not Found")
            }
            ErrorClassification::StatusCarrying { status, message } => {
                ErrorEnvelope::new(status, message)
            }
            ErrorClassification::Unclassified => {
                ErrorEnvelope::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }
}

/// Status and message of a rendered failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub status: StatusCode,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Wire bytes of the error shape.
    pub fn to_bytes(&self) -> GatewayResult<Bytes> {
        let body = ErrorBody {
            code: self.status.as_u16(),
            message: self.message.clone(),
        };
        Ok(Bytes::from(envelope::encode(&body)?))
    }
}

/// Converts failures into error envelopes on uncommitted exchanges.
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorEnvelopeMapper;

impl ErrorEnvelopeMapper {
    pub fn new() -> Self {
        Self
    }

    /// Render `error` into the exchange. Returns the error untouched when the
    /// response is already committed.
    pub async fn handle(&self, exchange: &mut Exchange, error: GatewayError) -> GatewayResult<()> {
        if exchange.is_committed() {
            return Err(error);
        }

        let classification = ErrorClassification::classify(&error);
        metrics::record_error(classification.label());
        let rendered = classification.into_envelope();

        tracing::error!(
            request_id = %exchange.request_id(),
            path = %exchange.path(),
            status = rendered.status.as_u16(),
            error = %error,
            "Request failed"
        );

        let payload = rendered.to_bytes()?;
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(payload.len()));

        exchange.write_direct(rendered.status, headers, payload).await
    }
}
