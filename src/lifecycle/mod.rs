//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Init logging/metrics → Build app → Bind → Serve
//!     any failure → fatal.rs (log, exit 1)
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain in-flight requests → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when the route table is final)

pub mod fatal;
pub mod shutdown;
pub mod signals;

pub use fatal::{fatal, or_exit};
pub use shutdown::Shutdown;
