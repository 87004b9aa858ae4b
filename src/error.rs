//! Dispatch error taxonomy.
//!
//! # Propagation
//! - `InvalidMiddlewareType` and `Pattern` are raised while routes are being
//!   registered; `App::build` surfaces them and the binary treats them as fatal
//! - `NotFound` and `HandlerFailure` are per-request and always end up in the
//!   error channel
//! - `Fatal` has no request to answer; it is logged and the process exits

use axum::http::StatusCode;
use thiserror::Error;

use crate::routing::pattern::PatternError;

/// Result alias for chain steps (middleware, handlers, recovery interceptors).
pub type Outcome = Result<(), DispatchError>;

/// Every failure the dispatch core can produce.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A value was supplied where a different kind of interceptor is required,
    /// e.g. a recovery interceptor in a route's success stack.
    #[error("Invalid middleware type: expected {expected} / got {got}")]
    InvalidMiddlewareType {
        expected: &'static str,
        got: &'static str,
    },

    /// No route matched the path, or the matching route lacks the verb.
    #[error("NOT FOUND: {path}")]
    NotFound { path: String },

    /// A middleware or handler failed, either by returning an error or by
    /// panicking.
    #[error("{message}")]
    HandlerFailure {
        message: String,
        status: Option<StatusCode>,
    },

    /// A route template could not be compiled.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// A failure with no request context to answer.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl DispatchError {
    /// Build a handler failure without an explicit status.
    pub fn handler(message: impl Into<String>) -> Self {
        DispatchError::HandlerFailure {
            message: message.into(),
            status: None,
        }
    }

    /// Build a handler failure that answers with `status`.
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        DispatchError::HandlerFailure {
            message: message.into(),
            status: Some(status),
        }
    }

    pub(crate) fn invalid_middleware(expected: &'static str, got: &'static str) -> Self {
        DispatchError::InvalidMiddlewareType { expected, got }
    }

    /// Status written by the fallback responder.
    ///
    /// `handler_default` applies only to a `HandlerFailure` that carries no
    /// status of its own.
    pub fn status_or(&self, handler_default: StatusCode) -> StatusCode {
        match self {
            DispatchError::InvalidMiddlewareType { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            DispatchError::NotFound { .. } => StatusCode::NOT_FOUND,
            DispatchError::HandlerFailure { status, .. } => status.unwrap_or(handler_default),
            DispatchError::Pattern(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DispatchError::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::InvalidMiddlewareType { .. } => "invalid_middleware_type",
            DispatchError::NotFound { .. } => "not_found",
            DispatchError::HandlerFailure { .. } => "handler_failure",
            DispatchError::Pattern(_) => "pattern",
            DispatchError::Fatal(_) => "fatal",
        }
    }
}

impl From<std::io::Error> for DispatchError {
    fn from(err: std::io::Error) -> Self {
        DispatchError::handler(err.to_string())
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        DispatchError::with_status(StatusCode::BAD_REQUEST, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_and_status() {
        let err = DispatchError::NotFound {
            path: "/missing".into(),
        };
        assert_eq!(err.to_string(), "NOT FOUND: /missing");
        assert_eq!(err.status_or(StatusCode::INTERNAL_SERVER_ERROR), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_handler_failure_uses_configured_default() {
        let err = DispatchError::handler("boom");
        assert_eq!(err.status_or(StatusCode::NOT_FOUND), StatusCode::NOT_FOUND);
        assert_eq!(
            err.status_or(StatusCode::INTERNAL_SERVER_ERROR),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let explicit = DispatchError::with_status(StatusCode::UNAUTHORIZED, "nope");
        assert_eq!(explicit.status_or(StatusCode::NOT_FOUND), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_invalid_middleware_is_500() {
        let err = DispatchError::invalid_middleware("success middleware", "recovery interceptor");
        assert_eq!(err.status_or(StatusCode::NOT_FOUND), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("recovery interceptor"));
    }
}
