//! Default response headers.
//!
//! Installed as the first global middleware. Failures raised before any
//! route stack runs (no match, unparsable body) skip that middleware, so the
//! dispatcher writes the same batch before entering the error channel.

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use futures_util::future::BoxFuture;

use crate::config::HeadersConfig;
use crate::error::Outcome;
use crate::http::{Request, Response};
use crate::pipeline::chain::Next;
use crate::pipeline::middleware::{Middleware, SharedMiddleware};

pub const POWERED_BY: &str = "waypoint";
pub const DEFAULT_REFERRER_POLICY: &str = "strict-origin-when-cross-origin";
pub const DEFAULT_SECURITY_POLICY: &str = "default-src 'self';base-uri 'self';block-all-mixed-content;\
font-src 'self' https: data:;frame-ancestors 'self';img-src 'self' data:;object-src 'none';\
script-src 'self';script-src-attr 'none';style-src 'self' https: 'unsafe-inline'";
pub const DEFAULT_STRICT_TRANSPORT: &str = "max-age=15552000; includeSubDomains";
pub const DEFAULT_CONTENT_TYPE_OPTIONS: &str = "nosniff";
pub const DEFAULT_VARY: &str = "Accept-Encoding";

/// The resolved header batch.
#[derive(Debug, Clone, Default)]
pub struct ResponseHeaders {
    batch: Vec<(HeaderName, HeaderValue)>,
}

impl ResponseHeaders {
    pub fn from_config(config: &HeadersConfig) -> Self {
        let mut headers = Self::default();

        let toggles = [
            ("referrer-policy", &config.referrer, DEFAULT_REFERRER_POLICY),
            ("content-security-policy", &config.security_policy, DEFAULT_SECURITY_POLICY),
            (
                "strict-transport-security",
                &config.strict_transport_security,
                DEFAULT_STRICT_TRANSPORT,
            ),
            (
                "x-content-type-options",
                &config.x_content_type_options,
                DEFAULT_CONTENT_TYPE_OPTIONS,
            ),
            ("vary", &config.vary, DEFAULT_VARY),
        ];
        for (name, toggle, default) in toggles {
            if let Some(value) = toggle.as_ref().and_then(|t| t.resolve(default)) {
                headers.push(name, &value);
            }
        }

        if config.x_powered_by {
            headers.push("x-powered-by", POWERED_BY);
        }

        for custom in &config.custom {
            headers.push(&custom.name, &custom.value);
        }

        headers
    }

    fn push(&mut self, name: &str, value: &str) {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => self.batch.push((name, value)),
            _ => tracing::warn!(header = %name, "Skipping invalid response header"),
        }
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// Write every header of the batch onto `res`.
    pub fn apply(&self, res: &mut Response) {
        for (name, value) in &self.batch {
            res.set_header(name.clone(), value.clone());
        }
    }

    /// Global middleware writing the batch, then advancing.
    pub fn into_middleware(self) -> SharedMiddleware {
        Arc::new(self)
    }
}

impl Middleware for ResponseHeaders {
    fn handle<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
        next: Next<'a>,
    ) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            self.apply(res);
            next.run(req, res).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{CustomHeader, HeaderToggle};
    use crate::pipeline::chain::Chain;
    use crate::pipeline::middleware::handler;
    use axum::http::{Method, Uri};

    #[test]
    fn test_default_config_only_powered_by() {
        let headers = ResponseHeaders::from_config(&HeadersConfig::default());
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_powered_by_can_be_disabled() {
        let config = HeadersConfig {
            x_powered_by: false,
            ..HeadersConfig::default()
        };
        assert!(ResponseHeaders::from_config(&config).is_empty());
    }

    #[test]
    fn test_invalid_custom_header_skipped() {
        let config = HeadersConfig {
            custom: vec![
                CustomHeader { name: "bad name".into(), value: "x".into() },
                CustomHeader { name: "x-ok".into(), value: "1".into() },
            ],
            ..HeadersConfig::default()
        };
        assert_eq!(ResponseHeaders::from_config(&config).len(), 2);
    }

    #[tokio::test]
    async fn test_middleware_writes_headers() {
        let config = HeadersConfig {
            referrer: Some(HeaderToggle::Flag(true)),
            vary: Some(HeaderToggle::Value("Origin".into())),
            strict_transport_security: Some(HeaderToggle::Flag(false)),
            ..HeadersConfig::default()
        };
        let stack = vec![ResponseHeaders::from_config(&config).into_middleware()];
        let done = handler(|_req, res| {
            Box::pin(async move {
                res.send("ok");
                Ok(())
            })
        });

        let mut req = Request::new(Method::GET, Uri::from_static("/"));
        let mut res = Response::for_request(&req);
        Chain::new(&stack, done.as_ref())
            .dispatch(&mut req, &mut res)
            .await
            .unwrap();

        assert_eq!(res.header("x-powered-by"), Some(POWERED_BY));
        assert_eq!(res.header("referrer-policy"), Some(DEFAULT_REFERRER_POLICY));
        assert_eq!(res.header("vary"), Some("Origin"));
        assert_eq!(res.header("strict-transport-security"), None);
    }

    #[test]
    fn test_apply_writes_batch() {
        let headers = ResponseHeaders::from_config(&HeadersConfig::default());
        let req = Request::new(Method::GET, Uri::from_static("/"));
        let mut res = Response::for_request(&req);
        headers.apply(&mut res);
        assert_eq!(res.header("x-powered-by"), Some(POWERED_BY));
        assert!(!res.sent());
    }
}
