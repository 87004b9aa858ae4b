//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (status codes, body limit)
//! - Check addresses and header names/values parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use thiserror::Error;

use crate::config::schema::{AppConfig, HeaderToggle};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: `{value}` is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("dispatch.handler_failure_status: {0} is not a valid HTTP status")]
    InvalidStatus(u16),

    #[error("dispatch.body_limit_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("observability.log_level: unknown level `{0}`")]
    UnknownLogLevel(String),

    #[error("headers.{field}: invalid header value")]
    InvalidHeaderValue { field: String },

    #[error("headers.custom: invalid header name `{0}`")]
    InvalidHeaderName(String),
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    let status = config.dispatch.handler_failure_status;
    if !(100..=599).contains(&status) || StatusCode::from_u16(status).is_err() {
        errors.push(ValidationError::InvalidStatus(status));
    }

    if config.dispatch.body_limit_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    let headers = &config.headers;
    let toggles = [
        ("referrer", &headers.referrer),
        ("security_policy", &headers.security_policy),
        ("strict_transport_security", &headers.strict_transport_security),
        ("x_content_type_options", &headers.x_content_type_options),
        ("vary", &headers.vary),
    ];
    for (field, toggle) in toggles {
        if let Some(HeaderToggle::Value(value)) = toggle {
            if HeaderValue::from_str(value).is_err() {
                errors.push(ValidationError::InvalidHeaderValue {
                    field: field.to_string(),
                });
            }
        }
    }

    for custom in &headers.custom {
        if HeaderName::from_bytes(custom.name.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidHeaderName(custom.name.clone()));
        }
        if HeaderValue::from_str(&custom.value).is_err() {
            errors.push(ValidationError::InvalidHeaderValue {
                field: format!("custom.{}", custom.name),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::CustomHeader;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.dispatch.handler_failure_status = 42;
        config.dispatch.body_limit_bytes = 0;
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::InvalidStatus(42)));
        assert!(errors.contains(&ValidationError::ZeroBodyLimit));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = AppConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::InvalidAddress { field: "observability.metrics_address", .. }
        ));
    }

    #[test]
    fn test_bad_headers_rejected() {
        let mut config = AppConfig::default();
        config.headers.vary = Some(HeaderToggle::Value("bad\nvalue".into()));
        config.headers.custom.push(CustomHeader {
            name: "bad header".into(),
            value: "ok".into(),
        });
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&ValidationError::InvalidHeaderName("bad header".into())));
    }
}
