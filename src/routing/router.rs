//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up matching route for request
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in priority order (acceptable for typical route counts)
//! - Explicit no-match (`None`) rather than silent default

use axum::http::request::Parts;
use axum::http::uri::Authority;

use crate::config::RouteConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::routing::matcher::{AndMatcher, HostMatcher, Matcher, PathPrefixMatcher};

/// A compiled route.
#[derive(Debug)]
pub struct Route {
    pub name: String,
    pub upstream: Authority,
    pub priority: u32,
    matcher: AndMatcher,
}

impl Route {
    pub fn matches(&self, parts: &Parts) -> bool {
        self.matcher.matches(parts)
    }
}

/// Immutable route table.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Compile routes, highest priority first. Equal priorities keep
    /// declaration order.
    pub fn from_config(configs: &[RouteConfig]) -> GatewayResult<Self> {
        let mut routes = configs
            .iter()
            .map(|config| {
                let upstream = config.upstream.parse::<Authority>().map_err(|e| {
                    GatewayError::Internal(format!(
                        "route '{}' has invalid upstream '{}': {}",
                        config.name, config.upstream, e
                    ))
                })?;

                let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();
                if let Some(host) = &config.host {
                    matchers.push(Box::new(HostMatcher::new(host.clone())));
                }
                if let Some(prefix) = &config.path_prefix {
                    matchers.push(Box::new(PathPrefixMatcher::new(prefix.clone())));
                }

                Ok(Route {
                    name: config.name.clone(),
                    upstream,
                    priority: config.priority,
                    matcher: AndMatcher::new(matchers),
                })
            })
            .collect::<GatewayResult<Vec<_>>>()?;

        routes.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(Self { routes })
    }

    /// First route matching the request, if any.
    pub fn match_request(&self, parts: &Parts) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(parts))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn route(name: &str, host: Option<&str>, prefix: Option<&str>, priority: u32) -> RouteConfig {
        RouteConfig {
            name: name.into(),
            host: host.map(Into::into),
            path_prefix: prefix.map(Into::into),
            upstream: "127.0.0.1:3000".into(),
            priority,
        }
    }

    fn parts(uri: &str) -> Parts {
        Request::builder()
            .uri(uri)
            .header("Host", "api.example.com")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn higher_priority_wins() {
        let router = Router::from_config(&[
            route("catch_all", None, Some("/"), 0),
            route("orders", None, Some("/orders"), 10),
            route("other_host", Some("web.example.com"), Some("/orders"), 20),
        ])
        .unwrap();

        assert_eq!(router.match_request(&parts("/orders/1")).unwrap().name, "orders");
        assert_eq!(router.match_request(&parts("/users")).unwrap().name, "catch_all");
    }

    #[test]
    fn no_match_is_explicit() {
        let router = Router::from_config(&[route("orders", None, Some("/orders"), 0)]).unwrap();
        assert!(router.match_request(&parts("/users")).is_none());
        assert!(Router::default().match_request(&parts("/")).is_none());
    }

    #[test]
    fn invalid_upstream_is_rejected() {
        let mut bad = route("bad", None, None, 0);
        bad.upstream = "not a host".into();
        assert!(Router::from_config(&[bad]).is_err());
    }
}
