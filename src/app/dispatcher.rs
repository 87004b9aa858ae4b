//! Per-request control flow.
//!
//! ```text
//! request
//!     → static files claim it?  global stack + stream handler
//!     → body parser
//!     → RouteTable::resolve (HEAD falls back to GET)
//!     → params written onto the request
//!     → Chain (merged stack, then handler)
//!     → Err → default headers (if nothing was sent)
//!           → ErrorChannel (recovery interceptors, then fallback)
//! ```
//!
//! The dispatcher is immutable and shared across requests through `Arc`.

use std::sync::Arc;
use std::time::Instant;

use axum::http::Method;

use crate::collab::{BodyParser, StaticFiles, Viewer};
use crate::error::{DispatchError, Outcome};
use crate::http::headers::ResponseHeaders;
use crate::http::{Request, Response};
use crate::observability::metrics;
use crate::pipeline::chain::Chain;
use crate::pipeline::middleware::SharedMiddleware;
use crate::pipeline::recovery::ErrorChannel;
use crate::routing::table::{Resolved, RouteTable};

const STATIC_ROUTE: &str = "<static>";

pub struct Dispatcher {
    global: Vec<SharedMiddleware>,
    headers: ResponseHeaders,
    table: RouteTable,
    errors: ErrorChannel,
    body_parser: Option<Arc<dyn BodyParser>>,
    static_files: Option<Arc<dyn StaticFiles>>,
    viewer: Option<Arc<dyn Viewer>>,
}

impl Dispatcher {
    pub(crate) fn new(
        global: Vec<SharedMiddleware>,
        headers: ResponseHeaders,
        table: RouteTable,
        errors: ErrorChannel,
        body_parser: Option<Arc<dyn BodyParser>>,
        static_files: Option<Arc<dyn StaticFiles>>,
        viewer: Option<Arc<dyn Viewer>>,
    ) -> Self {
        Self {
            global,
            headers,
            table,
            errors,
            body_parser,
            static_files,
            viewer,
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn error_channel(&self) -> &ErrorChannel {
        &self.errors
    }

    /// Dispatch one request. Always leaves `res` ended.
    pub async fn dispatch(&self, req: &mut Request, res: &mut Response) {
        let started = Instant::now();
        let method = req.method().clone();
        res.set_viewer(self.viewer.clone());

        let mut route = metrics::UNMATCHED.to_string();
        if let Err(err) = self.run(req, res, &mut route).await {
            tracing::debug!(
                request_id = %req.request_id(),
                path = %req.path(),
                kind = err.kind(),
                error = %err,
                "Dispatch failed"
            );
            metrics::record_failure(err.kind());
            if !res.sent() {
                self.headers.apply(res);
            }
            self.errors.dispatch(err, req, res).await;
        }

        if !res.sent() {
            tracing::warn!(
                request_id = %req.request_id(),
                path = %req.path(),
                "Chain finished without ending the response"
            );
            res.end();
        }

        metrics::record_request(&method, &route, res.status_code(), started.elapsed());
    }

    async fn run(&self, req: &mut Request, res: &mut Response, route: &mut String) -> Outcome {
        if let Some(files) = &self.static_files {
            if let Some(matched) = files.can_send(req) {
                tracing::debug!(file = %matched.file.display(), "Serving static file");
                *route = STATIC_ROUTE.to_string();
                let stream = files.stream(matched);
                return Chain::new(&self.global, stream.as_ref()).dispatch(req, res).await;
            }
        }

        if let Some(parser) = &self.body_parser {
            let body = parser.parse(req).await?;
            req.set_body(body);
        }

        let Resolved {
            route: matched,
            entry,
            params,
        } = self.resolve(req)?;
        *route = matched.path().to_string();
        req.set_params(params);

        Chain::new(entry.stack(), entry.handler().as_ref())
            .dispatch(req, res)
            .await
    }

    fn resolve(&self, req: &Request) -> Result<Resolved<'_>, DispatchError> {
        match self.table.resolve(req.path(), req.method()) {
            Err(DispatchError::NotFound { .. }) if req.method() == Method::HEAD => {
                self.table.resolve(req.path(), &Method::GET)
            }
            other => other,
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("global", &self.global.len())
            .field("routes", &self.table.len())
            .field("recovery", &self.errors.len())
            .field("body_parser", &self.body_parser.is_some())
            .field("static_files", &self.static_files.is_some())
            .field("viewer", &self.viewer.is_some())
            .finish()
    }
}
