//! Request identification.
//!
//! # Responsibilities
//! - Assign a request ID to every inbound request (UUID v4)
//! - Echo the ID on the response
//! - Make the ID available to the exchange for log correlation
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - An ID supplied by the client is kept as-is

use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Layer that sets `x-request-id` when the client did not send one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer that copies `x-request-id` from the request onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}
