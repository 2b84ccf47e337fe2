//! Per-request entry point.
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → Exchange::new
//!     → FilterChain::run (bounded by the request deadline)
//!         Ok  → Exchange::into_response
//!         Err → ErrorEnvelopeMapper::handle
//!                 Ok  → error envelope response
//!                 Err → aborted response (already committed)
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};

use crate::backend::Backend;
use crate::config::GatewayConfig;
use crate::error::GatewayResult;
use crate::filter::{BodyBuffer, Exchange, FilterChain, RequestCaptureFilter, ResponseWrapFilter};
use crate::http::response::ErrorEnvelopeMapper;
use crate::resilience::timeouts::with_request_deadline;

/// Filter chain plus error mapping; shared by every request.
#[derive(Debug)]
pub struct Gateway {
    chain: FilterChain,
    errors: ErrorEnvelopeMapper,
    deadline: Option<Duration>,
}

impl Gateway {
    pub fn new(chain: FilterChain) -> Self {
        Self {
            chain,
            errors: ErrorEnvelopeMapper::new(),
            deadline: None,
        }
    }

    /// Bound every exchange. Expiry before commit renders a 408 envelope.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Build the standard chain from configuration.
    pub fn from_config(config: &GatewayConfig, backend: Arc<dyn Backend>) -> GatewayResult<Self> {
        let filters = &config.filters;
        let mut builder = FilterChain::builder().backend_arc(backend);

        if filters.response_wrap {
            builder = builder.register(
                ResponseWrapFilter::new(BodyBuffer::new(filters.max_response_body_bytes))
                    .with_order(filters.response_wrap_order)
                    .with_success(&config.envelope.success_code, &config.envelope.success_msg),
            );
        }
        if filters.request_capture {
            builder = builder.register(
                RequestCaptureFilter::new(BodyBuffer::new(filters.max_request_body_bytes))
                    .with_order(filters.request_capture_order),
            );
        }

        Ok(Self::new(builder.build()?)
            .with_deadline(Duration::from_secs(config.timeouts.request_secs)))
    }

    pub fn chain(&self) -> &FilterChain {
        &self.chain
    }

    /// Run one request through the chain and turn the outcome into a response.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let mut exchange = Exchange::new(request);

        let outcome = match self.deadline {
            Some(deadline) => with_request_deadline(deadline, self.chain.run(&mut exchange)).await,
            None => self.chain.run(&mut exchange).await,
        };

        let error = match outcome {
            Ok(()) => return exchange.into_response(),
            Err(error) => error,
        };

        match self.errors.handle(&mut exchange, error).await {
            Ok(()) => exchange.into_response(),
            Err(error) => {
                tracing::warn!(
                    request_id = %exchange.request_id(),
                    path = %exchange.path(),
                    error = %error,
                    "Failure after response commit, aborting connection"
                );
                exchange.into_aborted_response(&error)
            }
        }
    }
}
