//! Application assembly and request dispatch.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     App (routes, use/mount, collaborators)
//!     → build(): inject global + prefix middleware, merge stacks
//!     → Dispatcher (immutable, Arc-shared)
//!
//! Per request:
//!     http::server → Dispatcher::dispatch → Response
//! ```

pub mod compose;
pub mod dispatcher;

pub use compose::{App, UseOptions};
pub use dispatcher::Dispatcher;
