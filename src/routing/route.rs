//! Per-path verb registry.
//!
//! A `RouteBuilder` collects handlers and middleware while the application
//! is being assembled. `merge_stacks` consumes it and produces an immutable
//! `Route` whose per-verb stacks are final:
//!
//! ```text
//! stack = injected (global ++ mount prefix) ++ shared (route-only) ++ verb
//! ```
//!
//! Only `Route` is reachable from dispatch, so a stack can never be served
//! before the last middleware was added.

use std::collections::HashMap;

use axum::http::Method;

use crate::error::DispatchError;
use crate::pipeline::middleware::{success_only, Interceptor, SharedHandler, SharedMiddleware};
use crate::routing::pattern::PathPattern;

/// A mount prefix and the middleware scoped to it.
#[derive(Clone, Default)]
pub struct MountPoint {
    prefix: String,
    middleware: Vec<SharedMiddleware>,
}

impl MountPoint {
    pub fn new(prefix: &str, middleware: Vec<SharedMiddleware>) -> Self {
        Self {
            prefix: normalize_prefix(prefix),
            middleware,
        }
    }

    /// Normalised prefix; empty for the root.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn middleware(&self) -> &[SharedMiddleware] {
        &self.middleware
    }

    pub(crate) fn extend(&mut self, middleware: impl IntoIterator<Item = SharedMiddleware>) {
        self.middleware.extend(middleware);
    }
}

impl std::fmt::Debug for MountPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountPoint")
            .field("prefix", &self.prefix)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

/// Handler, authored middleware and merged stack for one verb.
#[derive(Clone)]
pub struct MethodEntry {
    handler: SharedHandler,
    middleware: Vec<SharedMiddleware>,
    stack: Vec<SharedMiddleware>,
}

impl MethodEntry {
    fn new(handler: SharedHandler) -> Self {
        Self {
            handler,
            middleware: Vec::new(),
            stack: Vec::new(),
        }
    }

    pub fn handler(&self) -> &SharedHandler {
        &self.handler
    }

    /// Verb-specific middleware as registered.
    pub fn middleware(&self) -> &[SharedMiddleware] {
        &self.middleware
    }

    /// Final, ordered stack run before the handler.
    pub fn stack(&self) -> &[SharedMiddleware] {
        &self.stack
    }
}

impl std::fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodEntry")
            .field("middleware", &self.middleware.len())
            .field("stack", &self.stack.len())
            .finish()
    }
}

/// Registration-time form of a route.
pub struct RouteBuilder {
    path: String,
    unprefixed: String,
    prefix: String,
    pattern: PathPattern,
    shared: Vec<SharedMiddleware>,
    methods: HashMap<Method, MethodEntry>,
    stack: Vec<SharedMiddleware>,
    mount: Option<MountPoint>,
}

macro_rules! builder_verbs {
    ($($name:ident, $with:ident => $method:expr;)*) => {
        $(
            #[doc = concat!("Register the `", stringify!($method), "` handler.")]
            pub fn $name(&mut self, handler: SharedHandler) -> Result<&mut Self, DispatchError> {
                self.$with(Vec::new(), handler)
            }

            #[doc = concat!("Register the `", stringify!($method), "` handler with verb middleware.")]
            pub fn $with(
                &mut self,
                middleware: Vec<Interceptor>,
                handler: SharedHandler,
            ) -> Result<&mut Self, DispatchError> {
                let middleware = success_only(middleware)?;
                self.set_method($method, handler, middleware);
                Ok(self)
            }
        )*
    };
}

impl RouteBuilder {
    /// A route for `path`, compiled without a prefix.
    pub fn new(path: &str) -> Result<Self, DispatchError> {
        let key = route_key("", path);
        let pattern = PathPattern::compile(&key)?;
        Ok(Self {
            path: key,
            unprefixed: path.to_string(),
            prefix: String::new(),
            pattern,
            shared: Vec::new(),
            methods: HashMap::new(),
            stack: Vec::new(),
            mount: None,
        })
    }

    /// A route declared through the fluent `route(path, ..)` form: `shared`
    /// runs for every verb chained onto it.
    pub fn route_only(path: &str, shared: Vec<Interceptor>) -> Result<Self, DispatchError> {
        let shared = success_only(shared)?;
        let mut route = Self::new(path)?;
        route.extend_shared(shared);
        Ok(route)
    }

    pub(crate) fn extend_shared(&mut self, shared: Vec<SharedMiddleware>) {
        self.shared.extend(shared);
    }

    /// Full, prefixed template; the table key.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn has_method(&self, method: &Method) -> bool {
        self.methods.contains_key(method)
    }

    /// Register or replace the handler for `method`; middleware accumulates.
    pub fn set_method(
        &mut self,
        method: Method,
        handler: SharedHandler,
        middleware: Vec<SharedMiddleware>,
    ) -> &mut Self {
        let entry = self
            .methods
            .entry(method)
            .or_insert_with(|| MethodEntry::new(handler.clone()));
        entry.handler = handler;
        entry.middleware.extend(middleware);
        self
    }

    /// Place this route under `prefix`, recompiling its pattern.
    pub fn set_prefix(&mut self, prefix: &str) -> Result<&mut Self, DispatchError> {
        let prefix = normalize_prefix(prefix);
        let path = route_key(&prefix, &self.unprefixed);
        self.pattern = PathPattern::compile(&path)?;
        self.path = path;
        self.prefix = prefix;
        Ok(self)
    }

    /// Append injected (global or mount-prefix) middleware, after anything
    /// injected earlier.
    pub fn add_to_stack(&mut self, middleware: impl IntoIterator<Item = SharedMiddleware>) -> &mut Self {
        self.stack.extend(middleware);
        self
    }

    /// Record the mount point this route was attached through.
    pub fn attach_mount(&mut self, mount: MountPoint) -> &mut Self {
        self.mount = Some(mount);
        self
    }

    /// Finalise: compute every verb's stack and freeze the route.
    pub fn merge_stacks(self) -> Route {
        let RouteBuilder {
            path,
            prefix,
            pattern,
            shared,
            mut methods,
            stack,
            mount,
            ..
        } = self;

        for entry in methods.values_mut() {
            let mut merged = Vec::with_capacity(stack.len() + shared.len() + entry.middleware.len());
            merged.extend(stack.iter().cloned());
            merged.extend(shared.iter().cloned());
            merged.extend(entry.middleware.iter().cloned());
            entry.stack = merged;
        }

        Route {
            path,
            prefix,
            pattern,
            methods,
            mount,
        }
    }

    builder_verbs! {
        get, get_with => Method::GET;
        post, post_with => Method::POST;
        put, put_with => Method::PUT;
        patch, patch_with => Method::PATCH;
        delete, delete_with => Method::DELETE;
        trace, trace_with => Method::TRACE;
        options, options_with => Method::OPTIONS;
        connect, connect_with => Method::CONNECT;
    }
}

impl std::fmt::Debug for RouteBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteBuilder")
            .field("path", &self.path)
            .field("prefix", &self.prefix)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("shared", &self.shared.len())
            .field("stack", &self.stack.len())
            .finish()
    }
}

/// A finalised route, ready to serve.
pub struct Route {
    path: String,
    prefix: String,
    pattern: PathPattern,
    methods: HashMap<Method, MethodEntry>,
    mount: Option<MountPoint>,
}

impl Route {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn method(&self, method: &Method) -> Option<&MethodEntry> {
        self.methods.get(method)
    }

    pub fn methods(&self) -> impl Iterator<Item = (&Method, &MethodEntry)> {
        self.methods.iter()
    }

    pub fn mount_point(&self) -> Option<&MountPoint> {
        self.mount.as_ref()
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("prefix", &self.prefix)
            .field("methods", &self.methods)
            .finish()
    }
}

/// `/` and the empty string are the root; otherwise no trailing slash.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Table key for `path` under `prefix`: no trailing slash except for `/`.
pub fn route_key(prefix: &str, path: &str) -> String {
    let joined = format!("{prefix}{path}");
    let trimmed = joined.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
