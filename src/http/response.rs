//! Response under construction.
//!
//! # Responsibilities
//! - Collect status, headers and body written by middleware and handlers
//! - Track whether the response has been ended (`sent`)
//! - Drop the body of HEAD responses while keeping their headers
//! - Render views through the configured `Viewer`
//!
//! # Design Decisions
//! - Writes after the response is ended are ignored, not errors
//! - `send` sets `Content-Length` and a plain-text content type when the
//!   handler did not choose one

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::collab::Viewer;
use crate::error::DispatchError;
use crate::http::request::Request;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// Response written by the middleware chain.
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    ended: bool,
    head: bool,
    viewer: Option<Arc<dyn Viewer>>,
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("ended", &self.ended)
            .field("head", &self.head)
            .finish()
    }
}

impl Response {
    pub fn new(method: &Method) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            ended: false,
            head: method == Method::HEAD,
            viewer: None,
        }
    }

    /// Response paired with `req`.
    pub fn for_request(req: &Request) -> Self {
        Self::new(req.method())
    }

    pub(crate) fn set_viewer(&mut self, viewer: Option<Arc<dyn Viewer>>) {
        self.viewer = viewer;
    }

    /// True once the response has been ended; later writes are ignored.
    pub fn sent(&self) -> bool {
        self.ended
    }

    /// True when answering a HEAD request.
    pub fn is_head(&self) -> bool {
        self.head
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        if !self.ended {
            self.status = status;
        }
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        if !self.ended {
            self.headers.insert(name, value);
        }
        self
    }

    /// Set a header from strings, rejecting invalid names or values.
    pub fn try_set_header(&mut self, name: &str, value: &str) -> Result<&mut Self, DispatchError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| DispatchError::handler(format!("invalid header name `{name}`: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| DispatchError::handler(format!("invalid header value: {e}")))?;
        Ok(self.set_header(name, value))
    }

    /// End the response with `body`.
    pub fn send(&mut self, body: impl Into<Bytes>) {
        if self.ended {
            tracing::debug!("response already sent, ignoring body");
            return;
        }
        let body = body.into();
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
        }
        self.headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        self.body = body;
        self.ended = true;
    }

    /// Serialize `value` as JSON and end the response.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), DispatchError> {
        let body = serde_json::to_vec(value)
            .map_err(|e| DispatchError::handler(format!("response serialization failed: {e}")))?;
        self.set_header(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        self.send(body);
        Ok(())
    }

    pub fn html(&mut self, markup: impl Into<String>) {
        self.set_header(CONTENT_TYPE, HeaderValue::from_static(TEXT_HTML));
        self.send(markup.into());
    }

    /// Answer with `302 Found` pointing at `location`.
    pub fn redirect(&mut self, location: &str) -> Result<(), DispatchError> {
        let value = HeaderValue::from_str(location)
            .map_err(|e| DispatchError::handler(format!("invalid redirect location: {e}")))?;
        self.status(StatusCode::FOUND).set_header(LOCATION, value);
        self.end();
        Ok(())
    }

    /// End the response without a body.
    pub fn end(&mut self) {
        if !self.ended {
            self.send(Bytes::new());
        }
    }

    /// Render the view `name` with `data` and send it as HTML.
    pub fn render(&mut self, name: &str, data: &Value) -> Result<(), DispatchError> {
        let viewer = self
            .viewer
            .clone()
            .ok_or_else(|| DispatchError::handler("no view engine configured"))?;
        let markup = viewer.render(name, data)?;
        self.html(markup);
        Ok(())
    }

    /// Convert into the transport's response type.
    pub fn into_http(self) -> axum::response::Response {
        let body = if self.head {
            Body::empty()
        } else {
            Body::from(self.body)
        };
        let mut response = axum::response::Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_sets_length_and_type() {
        let mut res = Response::new(&Method::GET);
        res.send("hello");
        assert!(res.sent());
        assert_eq!(res.header("content-length"), Some("5"));
        assert_eq!(res.header("content-type"), Some(TEXT_PLAIN));
    }

    #[test]
    fn test_writes_after_end_are_ignored() {
        let mut res = Response::new(&Method::GET);
        res.status(StatusCode::CREATED).send("first");
        res.status(StatusCode::BAD_REQUEST).send("second");
        assert_eq!(res.status_code(), StatusCode::CREATED);
        assert_eq!(res.body().as_ref(), b"first");
    }

    #[test]
    fn test_json_body() {
        let mut res = Response::new(&Method::GET);
        res.json(&serde_json::json!({ "ok": true })).unwrap();
        assert_eq!(res.header("content-type"), Some(APPLICATION_JSON));
        assert_eq!(res.body().as_ref(), br#"{"ok":true}"#);
    }

    #[test]
    fn test_redirect() {
        let mut res = Response::new(&Method::GET);
        res.redirect("/login").unwrap();
        assert_eq!(res.status_code(), StatusCode::FOUND);
        assert_eq!(res.header("location"), Some("/login"));
        assert!(res.sent());
    }

    #[test]
    fn test_head_drops_body() {
        let mut res = Response::new(&Method::HEAD);
        assert!(res.is_head());
        res.send("payload");
        let http = res.into_http();
        assert_eq!(
            http.headers().get(CONTENT_LENGTH).and_then(|v| v.to_str().ok()),
            Some("7")
        );
    }

    #[test]
    fn test_try_set_header_validates() {
        let mut res = Response::new(&Method::GET);
        res.try_set_header("Cache-Control", "no-store").unwrap();
        assert_eq!(res.header("cache-control"), Some("no-store"));

        assert!(res.try_set_header("bad name", "x").is_err());
        assert!(res.try_set_header("x-ok", "line\nbreak").is_err());
        assert_eq!(res.header("x-ok"), None);
    }

    #[test]
    fn test_render_without_viewer_fails() {
        let mut res = Response::new(&Method::GET);
        let err = res.render("home", &Value::Null).unwrap_err();
        assert!(err.to_string().contains("no view engine"));
    }
}
