//! Route matching logic.
//!
//! # Responsibilities
//! - Match host header (exact match, case-insensitive)
//! - Match path prefix (case-sensitive)
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Host matching is case-insensitive (RFC 9110), port ignored
//! - Path matching is case-sensitive
//! - Empty condition = always matches (wildcard)

use axum::http::{header, request::Parts};

/// Trait for matching request metadata against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, parts: &Parts) -> bool;
}

/// Matches the Host header (or the URI authority for absolute-form requests).
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// The host is normalized to lowercase for case-insensitive matching.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, parts: &Parts) -> bool {
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| parts.uri.host());
        host.map(|h| h.split(':').next().unwrap_or(h))
            .map(|h| h.eq_ignore_ascii_case(&self.expected_host))
            .unwrap_or(false)
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, parts: &Parts) -> bool {
        parts.uri.path().starts_with(&self.prefix)
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, parts: &Parts) -> bool {
        self.matchers.iter().all(|m| m.matches(parts))
    }
}
