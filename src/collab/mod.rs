//! Collaborator contracts.
//!
//! Body decoding, static files and view rendering live outside dispatch.
//! The dispatcher only talks to them through these traits, so any of them
//! can be swapped or left out.

use std::path::PathBuf;

use axum::http::header::CONTENT_TYPE;
use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::error::DispatchError;
use crate::http::Request;
use crate::pipeline::middleware::SharedHandler;

/// Decodes the buffered request body before routing.
pub trait BodyParser: Send + Sync + 'static {
    /// `Ok(None)` when the body is not this parser's concern.
    fn parse<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Result<Option<Value>, DispatchError>>;
}

/// A file a `StaticFiles` collaborator agreed to serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticMatch {
    pub file: PathBuf,
}

/// Static file lookup. A claimed request skips routing: only global
/// middleware run before the stream handler.
pub trait StaticFiles: Send + Sync + 'static {
    fn can_send(&self, req: &Request) -> Option<StaticMatch>;

    fn stream(&self, matched: StaticMatch) -> SharedHandler;
}

/// Template rendering used by `Response::render`.
pub trait Viewer: Send + Sync + 'static {
    fn render(&self, name: &str, data: &Value) -> Result<String, DispatchError>;
}

/// Parses `application/json` (and `+json`) bodies into a `serde_json::Value`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBodyParser;

impl JsonBodyParser {
    fn accepts(req: &Request) -> bool {
        req.header(CONTENT_TYPE.as_str())
            .and_then(|ct| ct.split(';').next())
            .map(|mime| {
                let mime = mime.trim().to_ascii_lowercase();
                mime == "application/json" || mime.ends_with("+json")
            })
            .unwrap_or(false)
    }
}

impl BodyParser for JsonBodyParser {
    fn parse<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Result<Option<Value>, DispatchError>> {
        Box::pin(async move {
            if req.raw_body().is_empty() || !Self::accepts(req) {
                return Ok(None);
            }
            let value: Value = serde_json::from_slice(req.raw_body())?;
            Ok(Some(value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode, Uri};

    fn post(content_type: &str, body: &'static str) -> Request {
        Request::new(Method::POST, Uri::from_static("/submit"))
            .with_header("content-type", content_type)
            .with_body(body)
    }

    #[tokio::test]
    async fn test_json_body_parsed() {
        let req = post("application/json; charset=utf-8", r#"{"name":"ada"}"#);
        let value = JsonBodyParser.parse(&req).await.unwrap().unwrap();
        assert_eq!(value["name"], "ada");
    }

    #[tokio::test]
    async fn test_vendor_json_accepted() {
        let req = post("application/vnd.api+json", "[1,2]");
        assert!(JsonBodyParser.parse(&req).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_other_content_types_ignored() {
        let req = post("text/plain", "hello");
        assert!(JsonBodyParser.parse(&req).await.unwrap().is_none());

        let empty = post("application/json", "");
        assert!(JsonBodyParser.parse(&empty).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let req = post("application/json", "{nope");
        let err = JsonBodyParser.parse(&req).await.unwrap_err();
        assert_eq!(err.status_or(StatusCode::INTERNAL_SERVER_ERROR), StatusCode::BAD_REQUEST);
    }
}
