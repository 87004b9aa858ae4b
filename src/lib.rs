//! Waypoint: an HTTP dispatch core.
//!
//! Path patterns, per-verb route registry, ordered middleware chains with a
//! separate recovery chain, and prefix mounting, served through Axum.

pub mod app;
pub mod collab;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod routing;

pub use app::{App, Dispatcher, UseOptions};
pub use config::AppConfig;
pub use error::{DispatchError, Outcome};
pub use http::{HttpServer, Request, Response};
pub use lifecycle::Shutdown;
pub use pipeline::{handler, middleware, recovery, Interceptor, Next, RecoveryNext};
pub use routing::Router;
