//! Request-time route lookup.
//!
//! # Responsibilities
//! - Hold finalised routes in registration order
//! - Resolve (path, method) to a route, its verb entry and extracted params
//!
//! # Design Decisions
//! - Immutable once built; shared across requests without locks
//! - Exact-key lookup first, then a registration-order pattern scan
//! - First matching route that knows the verb wins, never the most specific
//! - Explicit `NotFound` rather than a silent default

use std::collections::HashMap;

use axum::http::Method;

use crate::error::DispatchError;
use crate::routing::pattern::Params;
use crate::routing::route::{route_key, MethodEntry, Route};

/// Outcome of a successful lookup.
#[derive(Debug)]
pub struct Resolved<'a> {
    pub route: &'a Route,
    pub entry: &'a MethodEntry,
    pub params: Params,
}

/// Insertion-ordered collection of finalised routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    index: HashMap<String, usize>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `route`. A route already stored under the same key is replaced
    /// in place, keeping its registration position.
    pub fn insert(&mut self, route: Route) {
        match self.index.get(route.path()) {
            Some(&slot) => {
                tracing::warn!(path = %route.path(), "Route replaced by a later registration");
                self.routes[slot] = route;
            }
            None => {
                self.index.insert(route.path().to_string(), self.routes.len());
                self.routes.push(route);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Route> {
        self.index.get(key).map(|&slot| &self.routes[slot])
    }

    /// Routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    /// Find the route serving `method` at the concrete `path`.
    pub fn resolve(&self, path: &str, method: &Method) -> Result<Resolved<'_>, DispatchError> {
        let key = route_key("", path);

        if let Some(route) = self.get(&key) {
            if let Some(entry) = route.method(method) {
                let params = route.pattern().captures(path).unwrap_or_default();
                return Ok(Resolved { route, entry, params });
            }
        }

        for route in &self.routes {
            let Some(entry) = route.method(method) else {
                continue;
            };
            if let Some(params) = route.pattern().captures(path) {
                return Ok(Resolved { route, entry, params });
            }
        }

        Err(DispatchError::NotFound {
            path: path.to_string(),
        })
    }
}
