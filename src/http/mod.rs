//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tower layers)
//!     → request.rs (request ID)
//!     → Gateway (filter chain → backend)
//!     → response.rs (failures → error envelope)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::{ErrorClassification, ErrorEnvelope, ErrorEnvelopeMapper};
pub use server::HttpServer;
