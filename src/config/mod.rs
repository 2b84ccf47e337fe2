//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → consumed once at startup to build the filter chain and backend
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the filter chain is built from it once
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    EnvelopeConfig, FilterConfig, GatewayConfig, ListenerConfig, ObservabilityConfig,
    RouteConfig, TimeoutConfig,
};
pub use validation::ValidationError;
