//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every section has defaults, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for the dispatcher and its server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Request dispatch settings.
    pub dispatch: DispatchConfig,

    /// Default response headers.
    pub headers: HeadersConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Status for a handler failure that did not pick one.
    pub handler_failure_status: u16,

    /// Largest request body buffered before dispatch.
    pub body_limit_bytes: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            handler_failure_status: 500,
            body_limit_bytes: 2 * 1024 * 1024,
        }
    }
}

/// A header that is either switched on with its default value, switched
/// off, or given an explicit value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum HeaderToggle {
    Flag(bool),
    Value(String),
}

impl HeaderToggle {
    /// Value to send, if any.
    pub fn resolve(&self, default: &str) -> Option<String> {
        match self {
            HeaderToggle::Flag(true) => Some(default.to_string()),
            HeaderToggle::Flag(false) => None,
            HeaderToggle::Value(value) => Some(value.clone()),
        }
    }
}

/// An extra header set on every response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CustomHeader {
    pub name: String,
    pub value: String,
}

/// Headers written by the default global middleware.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeadersConfig {
    /// `Referrer-Policy`.
    pub referrer: Option<HeaderToggle>,

    /// `Content-Security-Policy`.
    pub security_policy: Option<HeaderToggle>,

    /// `Strict-Transport-Security`.
    pub strict_transport_security: Option<HeaderToggle>,

    /// `X-Content-Type-Options`.
    pub x_content_type_options: Option<HeaderToggle>,

    /// `Vary`.
    pub vary: Option<HeaderToggle>,

    /// Send `X-Powered-By`.
    pub x_powered_by: bool,

    pub custom: Vec<CustomHeader>,
}

impl Default for HeadersConfig {
    fn default() -> Self {
        Self {
            referrer: None,
            security_policy: None,
            strict_transport_security: None,
            x_content_type_options: None,
            vary: None,
            x_powered_by: true,
            custom: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
