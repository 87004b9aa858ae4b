//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Provide an access-log interceptor for the global stack
//! - Configure log level at startup
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and environment (`RUST_LOG` wins)

use std::time::Instant;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::pipeline::middleware::{middleware, Interceptor};

/// Install the global subscriber. Returns `false` when one was already set.
pub fn init(config: &ObservabilityConfig) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("waypoint={},tower_http=debug", config.log_level.to_ascii_lowercase()).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    result.is_ok()
}

/// Global middleware logging one line per request once the chain returns.
pub fn access_log() -> Interceptor {
    middleware(|req, res, next| {
        Box::pin(async move {
            let started = Instant::now();
            let method = req.method().clone();
            let path = req.path().to_string();
            let outcome = next.run(&mut *req, &mut *res).await;
            tracing::info!(
                request_id = %req.request_id(),
                method = %method,
                path = %path,
                status = res.status_code().as_u16(),
                failed = outcome.is_err(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Request handled"
            );
            outcome
        })
    })
}
