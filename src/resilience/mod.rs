//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (enforce upstream deadline)
//!     → On expiry: status-carrying 504 handed to the error envelope mapper
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - No retries at this layer

pub mod timeouts;
