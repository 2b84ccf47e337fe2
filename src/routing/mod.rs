//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request metadata (host, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: matched Route or no match (→ RouteNotFound)
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Sort by priority
//!     → Compile matchers
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - First match wins (ordered by priority)

pub mod matcher;
pub mod router;

pub use router::{Route, Router};
