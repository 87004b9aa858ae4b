//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (startup):
//!     template → pattern.rs (compile to case-insensitive regex)
//!     verb + handler → router.rs (one RouteBuilder per literal path)
//!     → app::compose injects global/prefix middleware
//!     → route.rs merge_stacks → Route
//!     → table.rs (insertion-ordered, frozen)
//!
//! Lookup (per request):
//!     (path, method) → exact key → registration-order scan → Resolved | NotFound
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: earliest registered match wins
//! - Builders and finalised routes are different types

pub mod pattern;
pub mod route;
pub mod router;
pub mod table;

pub use pattern::{Params, PathPattern, PatternError};
pub use route::{MethodEntry, MountPoint, Route, RouteBuilder};
pub use router::Router;
pub use table::{Resolved, RouteTable};
