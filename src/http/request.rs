//! Request view handed to middleware and handlers.
//!
//! # Responsibilities
//! - Normalise method and path before routing (query stripped, trailing
//!   slash collapsed except for root)
//! - Carry the parameter map written by route lookup
//! - Hold the raw body bytes and whatever the body parser produced
//! - Expose header helpers (`referer`/`referrer` alias, forwarded host)
//!
//! # Design Decisions
//! - The transport reads the body up front with the configured limit, so
//!   the request stays `Sync` and can be borrowed across await points
//! - A request id is always present: the `x-request-id` header set by the
//!   transport layer, or a fresh UUID when dispatched directly

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::Query;
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use serde_json::Value;
use uuid::Uuid;

use crate::routing::pattern::Params;

/// Header carrying the request id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// An already-parsed HTTP request.
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    path: String,
    headers: HeaderMap,
    params: Params,
    raw_body: Bytes,
    body: Option<Value>,
    extensions: Extensions,
}

impl Request {
    /// Create a request with no headers and an empty body.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self::assemble(method, uri, HeaderMap::new(), Extensions::new(), Bytes::new())
    }

    /// Build from the transport's request head and the buffered body.
    pub fn from_parts(parts: Parts, body: Bytes) -> Self {
        Self::assemble(parts.method, parts.uri, parts.headers, parts.extensions, body)
    }

    fn assemble(
        method: Method,
        uri: Uri,
        mut headers: HeaderMap,
        extensions: Extensions,
        raw_body: Bytes,
    ) -> Self {
        if !headers.contains_key(X_REQUEST_ID) {
            if let Ok(id) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
                headers.insert(X_REQUEST_ID, id);
            }
        }
        let path = normalize_path(uri.path());
        Self {
            method,
            uri,
            path,
            headers,
            params: Params::new(),
            raw_body,
            body: None,
            extensions,
        }
    }

    /// Attach a header (builder style).
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Replace the raw body (builder style).
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.raw_body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Normalised path used for routing.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Header value as a string. `referer` and `referrer` are interchangeable.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        let lookup = |n: &str| self.headers.get(n).and_then(|v| v.to_str().ok());
        match name.as_str() {
            "referer" | "referrer" => lookup("referer").or_else(|| lookup("referrer")),
            other => lookup(other),
        }
    }

    /// Host as seen by the client, preferring the first `X-Forwarded-Host`.
    pub fn host(&self) -> Option<&str> {
        match self.header("x-forwarded-host") {
            Some(forwarded) => forwarded.split(',').next().map(str::trim),
            None => self.header("host"),
        }
    }

    pub fn request_id(&self) -> &str {
        self.header(X_REQUEST_ID).unwrap_or("unknown")
    }

    /// Query string parsed into a map; malformed queries yield an empty map.
    pub fn query(&self) -> HashMap<String, String> {
        Query::<HashMap<String, String>>::try_from_uri(&self.uri)
            .map(|Query(q)| q)
            .unwrap_or_default()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Written by route lookup before the stack runs.
    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    pub fn raw_body(&self) -> &Bytes {
        &self.raw_body
    }

    /// Body produced by the configured body parser, if any.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn set_body(&mut self, body: Option<Value>) {
        self.body = body;
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

/// Collapse a trailing slash, keeping `/` for the root.
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    if path.len() >= 2 {
        if let Some(stripped) = path.strip_suffix('/') {
            return stripped.to_string();
        }
    }
    path.to_string()
}
