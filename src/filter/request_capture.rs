//! Request capture filter.
//!
//! # Responsibilities
//! - Safe methods: hand query parameters to the inspector, forward untouched
//! - Mutating methods: capture the body, hand its text to the inspector,
//!   replay identical bytes to downstream consumers
//! - Keep framing consistent with the replayed body
//!
//! # Design Decisions
//! - The original body stream is taken once and never read again
//! - Downstream filters run only after capture completes
//! - The inspector is the hook for auditing and authentication; returning an
//!   error rejects the request before the backend is called

use std::sync::Arc;

use axum::http::{header, HeaderValue, StatusCode};
use futures_util::future::BoxFuture;

use crate::error::{GatewayError, GatewayResult};
use crate::filter::body::{BodyBuffer, Charset};
use crate::filter::chain::Next;
use crate::filter::exchange::Exchange;
use crate::filter::GlobalFilter;

/// Default position of the filter in the chain.
pub const REQUEST_CAPTURE_ORDER: i32 = 0;

/// Hook receiving the inbound payload.
pub trait RequestInspector: Send + Sync + 'static {
    /// Called for safe methods with the decoded query parameters.
    fn inspect_query(&self, exchange: &Exchange, params: &[(String, String)]) -> GatewayResult<()>;

    /// Called for mutating methods with the decoded body text.
    fn inspect_body(&self, exchange: &Exchange, body: &str) -> GatewayResult<()>;
}

/// Inspector that writes the payload to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingInspector;

impl RequestInspector for LoggingInspector {
    fn inspect_query(&self, exchange: &Exchange, params: &[(String, String)]) -> GatewayResult<()> {
        let params: serde_json::Map<String, serde_json::Value> = params
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        tracing::info!(
            request_id = %exchange.request_id(),
            method = %exchange.method(),
            path = %exchange.path(),
            params = %serde_json::Value::Object(params),
            "Request parameters"
        );
        Ok(())
    }

    fn inspect_body(&self, exchange: &Exchange, body: &str) -> GatewayResult<()> {
        tracing::info!(
            request_id = %exchange.request_id(),
            method = %exchange.method(),
            path = %exchange.path(),
            body = %body,
            "Request payload"
        );
        Ok(())
    }
}

/// Buffers mutating request bodies for inspection and replays them.
pub struct RequestCaptureFilter {
    order: i32,
    buffer: BodyBuffer,
    inspector: Arc<dyn RequestInspector>,
}

impl RequestCaptureFilter {
    pub fn new(buffer: BodyBuffer) -> Self {
        Self {
            order: REQUEST_CAPTURE_ORDER,
            buffer,
            inspector: Arc::new(LoggingInspector),
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_inspector<I: RequestInspector>(mut self, inspector: I) -> Self {
        self.inspector = Arc::new(inspector);
        self
    }
}

impl Default for RequestCaptureFilter {
    fn default() -> Self {
        Self::new(BodyBuffer::unbounded())
    }
}

impl GlobalFilter for RequestCaptureFilter {
    fn name(&self) -> &'static str {
        "request_capture"
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn filter<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        chain: Next<'a>,
    ) -> BoxFuture<'a, GatewayResult<()>> {
        Box::pin(async move {
            if exchange.method().is_safe() {
                let params = exchange.query_pairs();
                self.inspector.inspect_query(exchange, &params)?;
                return chain.run(exchange).await;
            }

            let Some(body) = exchange.take_body() else {
                return chain.run(exchange).await;
            };

            let charset = Charset::from_headers(exchange.headers());
            let captured = self
                .buffer
                .capture(body, charset)
                .await
                .map_err(|e| match e {
                    GatewayError::BodyTooLarge { .. } => {
                        GatewayError::status(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
                    }
                    other => other,
                })?;

            self.inspector.inspect_body(exchange, &captured.text())?;

            let headers = exchange.headers_mut();
            headers.remove(header::TRANSFER_ENCODING);
            if !captured.is_empty() || headers.contains_key(header::CONTENT_LENGTH) {
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(captured.len()));
            }
            exchange.replace_body(BodyBuffer::replay(&captured));

            chain.run(exchange).await
        })
    }
}
