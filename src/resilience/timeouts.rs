//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap upstream calls with a deadline
//! - Bound a whole exchange (upload, upstream, response buffering)
//! - Cancel the work cleanly when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Expiry is a status-carrying error, so the error envelope mapper renders it
//! - Upstream calls expire as 504 Gateway Timeout, whole exchanges as
//!   408 Request Timeout

use std::future::Future;
use std::time::Duration;

use axum::http::StatusCode;

use crate::error::{GatewayError, GatewayResult};

/// Run an upstream call with a deadline. The future is dropped when time
/// runs out.
pub async fn with_deadline<F, T>(deadline: Duration, fut: F) -> GatewayResult<T>
where
    F: Future<Output = GatewayResult<T>>,
{
    expire_as(deadline, StatusCode::GATEWAY_TIMEOUT, "Gateway Timeout", fut).await
}

/// Run a whole exchange with a deadline.
pub async fn with_request_deadline<F, T>(deadline: Duration, fut: F) -> GatewayResult<T>
where
    F: Future<Output = GatewayResult<T>>,
{
    expire_as(deadline, StatusCode::REQUEST_TIMEOUT, "Request Timeout", fut).await
}

async fn expire_as<F, T>(
    deadline: Duration,
    status: StatusCode,
    message: &'static str,
    fut: F,
) -> GatewayResult<T>
where
    F: Future<Output = GatewayResult<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::status(status, message)),
    }
}
