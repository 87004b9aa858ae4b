//! Interceptor pipeline.
//!
//! # Data Flow
//! ```text
//! Resolved stack + handler
//!     → chain.rs (Next drives stack[0..n], then the handler)
//!     → Ok: response written by a step
//!     → Err / panic → recovery.rs (RecoveryNext drives recovery interceptors)
//!     → fallback responder (status + message)
//! ```
//!
//! # Design Decisions
//! - Success and recovery interceptors are distinct types, tagged at
//!   registration
//! - A continuation is consumed by advancing, so no step runs twice
//! - Panics are caught at the step that raised them

pub mod chain;
pub mod middleware;
pub mod recovery;

pub use chain::{Chain, Next};
pub use middleware::{
    handler, middleware, recovery, Handler, Interceptor, Middleware, Recovery, SharedHandler,
    SharedMiddleware, SharedRecovery,
};
pub use recovery::{ErrorChannel, RecoveryNext};
