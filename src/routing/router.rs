//! Registration-time route collection.
//!
//! # Responsibilities
//! - Collect verb registrations, one builder per literal path
//! - Hand builders to the composition layer for prefixing and merging
//!
//! # Design Decisions
//! - Same path twice merges into one route, never two
//! - Registration order is preserved; it decides lookup ties later
//! - Nothing here is reachable at request time; `build` freezes into a
//!   `RouteTable`

use std::collections::HashMap;

use axum::http::Method;

use crate::error::DispatchError;
use crate::pipeline::middleware::{success_only, Interceptor, SharedHandler};
use crate::routing::route::{route_key, RouteBuilder};
use crate::routing::table::RouteTable;

/// A set of routes that can be served directly or mounted under a prefix.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<RouteBuilder>,
    index: HashMap<String, usize>,
}

macro_rules! router_verbs {
    ($($name:ident, $with:ident => $method:expr;)*) => {
        $(
            #[doc = concat!("Register a `", stringify!($method), "` handler for `path`.")]
            pub fn $name(&mut self, path: &str, handler: SharedHandler) -> Result<&mut Self, DispatchError> {
                self.on($method, path, Vec::new(), handler)
            }

            #[doc = concat!("Register a `", stringify!($method), "` handler for `path` with verb middleware.")]
            pub fn $with(
                &mut self,
                path: &str,
                middleware: Vec<Interceptor>,
                handler: SharedHandler,
            ) -> Result<&mut Self, DispatchError> {
                self.on($method, path, middleware, handler)
            }
        )*
    };
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method` at `path`.
    pub fn on(
        &mut self,
        method: Method,
        path: &str,
        middleware: Vec<Interceptor>,
        handler: SharedHandler,
    ) -> Result<&mut Self, DispatchError> {
        let middleware = success_only(middleware)?;
        let route = self.entry(path)?;
        route.set_method(method, handler, middleware);
        Ok(self)
    }

    /// Fluent form: `shared` runs for every verb chained on the returned
    /// builder. Calling it again for the same path appends to `shared`.
    pub fn route(
        &mut self,
        path: &str,
        shared: Vec<Interceptor>,
    ) -> Result<&mut RouteBuilder, DispatchError> {
        let shared = success_only(shared)?;
        let route = self.entry(path)?;
        route.extend_shared(shared);
        Ok(route)
    }

    fn entry(&mut self, path: &str) -> Result<&mut RouteBuilder, DispatchError> {
        let key = route_key("", path);
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                let builder = RouteBuilder::new(path)?;
                self.index.insert(key, self.routes.len());
                self.routes.push(builder);
                self.routes.len() - 1
            }
        };
        Ok(&mut self.routes[slot])
    }

    /// Whether `path` already has a route.
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(&route_key("", path))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Route keys in registration order.
    pub fn paths(&self) -> Vec<&str> {
        self.routes.iter().map(RouteBuilder::path).collect()
    }

    pub(crate) fn into_builders(self) -> Vec<RouteBuilder> {
        self.routes
    }

    /// Finalise every route as-is, with no injected middleware.
    pub fn build(self) -> RouteTable {
        let mut table = RouteTable::new();
        for route in self.routes {
            table.insert(route.merge_stacks());
        }
        table
    }

    router_verbs! {
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
