//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, value ranges and route identity
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use axum::http::uri::Authority;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let mut names = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        if route.name.trim().is_empty() {
            errors.push(ValidationError::new(format!("routes[{i}].name"), "must not be empty"));
        } else if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::new(
                format!("routes[{i}].name"),
                format!("duplicate route name '{}'", route.name),
            ));
        }
        if route.upstream.parse::<Authority>().is_err() {
            errors.push(ValidationError::new(
                format!("routes[{i}].upstream"),
                format!("'{}' is not a host:port authority", route.upstream),
            ));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::new("timeouts.upstream_secs", "must be greater than 0"));
    }

    if config.filters.max_request_body_bytes == 0 {
        errors.push(ValidationError::new(
            "filters.max_request_body_bytes",
            "must be greater than 0",
        ));
    }
    if config.filters.max_response_body_bytes == 0 {
        errors.push(ValidationError::new(
            "filters.max_response_body_bytes",
            "must be greater than 0",
        ));
    }

    if config.envelope.success_code.is_empty() {
        errors.push(ValidationError::new("envelope.success_code", "must not be empty"));
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("'{}' is not one of pretty, json", config.observability.log_format),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteConfig;

    fn route(name: &str, upstream: &str) -> RouteConfig {
        RouteConfig {
            name: name.into(),
            host: None,
            path_prefix: Some("/".into()),
            upstream: upstream.into(),
            priority: 0,
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn duplicate_and_malformed_routes_are_reported() {
        let mut config = GatewayConfig::default();
        config.routes.push(route("api", "127.0.0.1:3000"));
        config.routes.push(route("api", "127.0.0.1:3001"));
        config.routes.push(route("", "not a host"));

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["routes[1].name", "routes[2].name", "routes[2].upstream"]);
    }

    #[test]
    fn bad_listener_and_log_format_are_reported() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "localhost".into();
        config.observability.log_format = "xml".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "listener.bind_address");
        assert_eq!(errors[1].field, "observability.log_format");
    }
}
