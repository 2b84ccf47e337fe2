//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::envelope::{SUCCESS_CODE, SUCCESS_MSG};
use crate::filter::request_capture::REQUEST_CAPTURE_ORDER;
use crate::filter::response_wrap::RESPONSE_WRAP_ORDER;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Route definitions mapping requests to upstreams.
    pub routes: Vec<RouteConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Built-in filter settings.
    pub filters: FilterConfig,

    /// Success envelope settings.
    pub envelope: EnvelopeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Route configuration mapping requests to an upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging.
    pub name: String,

    /// Host header to match (exact match).
    pub host: Option<String>,

    /// Path prefix to match.
    pub path_prefix: Option<String>,

    /// Upstream address (e.g., "127.0.0.1:3000").
    pub upstream: String,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time for request/response in seconds.
    pub request_secs: u64,

    /// Deadline for the upstream call in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_secs: 10,
        }
    }
}

/// Built-in filter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Capture and log mutating request bodies.
    pub request_capture: bool,

    /// Wrap responses in the success envelope.
    pub response_wrap: bool,

    pub request_capture_order: i32,

    pub response_wrap_order: i32,

    /// Largest request body the capture filter will buffer.
    pub max_request_body_bytes: usize,

    /// Largest upstream payload the wrap filter will buffer.
    pub max_response_body_bytes: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            request_capture: true,
            response_wrap: true,
            request_capture_order: REQUEST_CAPTURE_ORDER,
            response_wrap_order: RESPONSE_WRAP_ORDER,
            max_request_body_bytes: 2 * 1024 * 1024,   // 2MB
            max_response_body_bytes: 16 * 1024 * 1024, // 16MB
        }
    }
}

/// Success envelope configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    pub success_code: String,
    pub success_msg: String,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            success_code: SUCCESS_CODE.to_string(),
            success_msg: SUCCESS_MSG.to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
