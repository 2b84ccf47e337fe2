//! Filter pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! Exchange
//!     → chain.rs (ascending order)
//!         → response_wrap.rs   (order -2: decorates the response writer)
//!         → request_capture.rs (order  0: buffers and replays the request body)
//!         → [backend invocation]
//!     ← writer stack: EnvelopeWriter → TransportWriter (commit)
//! ```
//!
//! # Design Decisions
//! - A filter is a name, an integer order and an async action over the
//!   exchange plus a continuation
//! - Lower order runs earlier inbound; outbound work happens through writer
//!   decorators, so it runs in reverse
//! - Body buffering lives in body.rs and is shared by both filters

pub mod body;
pub mod chain;
pub mod exchange;
pub mod request_capture;
pub mod response_wrap;

use futures_util::future::BoxFuture;

use crate::error::GatewayResult;

pub use body::{BodyBuffer, CapturedBody, Charset};
pub use chain::{FilterChain, FilterChainBuilder, Next};
pub use exchange::{Exchange, ResponseWriter, ServerResponse, TransportWriter};
pub use request_capture::{LoggingInspector, RequestCaptureFilter, RequestInspector};
pub use response_wrap::{EnvelopeWriter, ResponseWrapFilter};

/// A unit of request/response processing.
pub trait GlobalFilter: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Lower values run earlier on the inbound path.
    fn order(&self) -> i32;

    /// Process the exchange. Call `chain.run(exchange)` to continue, or return
    /// without calling it to short-circuit.
    fn filter<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        chain: Next<'a>,
    ) -> BoxFuture<'a, GatewayResult<()>>;
}
