//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, body buffering)
//!     → request.rs (normalised path, params, headers)
//!     → [app::Dispatcher runs the matched chain]
//!     → response.rs (status, headers, body; HEAD drops the body)
//!     → Send to client
//! ```

pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use headers::ResponseHeaders;
pub use request::{normalize_path, Request, X_REQUEST_ID};
pub use response::Response;
pub use server::HttpServer;
