//! Composition layer.
//!
//! # Responsibilities
//! - Collect global middleware, recovery interceptors and mounted routers
//! - Keep registration order across root routes and mounts
//! - Inject global and prefix-scoped middleware, merge stacks, freeze the
//!   route table
//!
//! # Design Decisions
//! - Stacks are merged in `build`, after the last registration, so
//!   middleware registered after a mount still applies to it
//! - Every mount point sharing a prefix contributes to that prefix's
//!   middleware, in registration order
//! - Root routes belong to the mount point at `/`
//!
//! Effective order for one route and verb:
//!
//! ```text
//! global → prefix (mount point) → route-only shared → verb → handler
//! ```

use std::sync::Arc;

use axum::http::{Method, StatusCode};

use crate::app::dispatcher::Dispatcher;
use crate::collab::{BodyParser, StaticFiles, Viewer};
use crate::config::AppConfig;
use crate::error::DispatchError;
use crate::http::headers::ResponseHeaders;
use crate::pipeline::middleware::{
    success_only, Interceptor, SharedHandler, SharedMiddleware, SharedRecovery,
};
use crate::pipeline::recovery::ErrorChannel;
use crate::routing::route::{normalize_prefix, MountPoint, RouteBuilder};
use crate::routing::router::Router;
use crate::routing::table::RouteTable;

/// Arguments of [`App::use_with`].
///
/// - no prefix and no router: `middleware` is global; recovery
///   interceptors join the error channel
/// - otherwise: `middleware` is scoped to `prefix` (default `/`) and
///   `router`, if any, is mounted there
#[derive(Debug, Default)]
pub struct UseOptions {
    pub prefix: Option<String>,
    pub middleware: Vec<Interceptor>,
    pub router: Option<Router>,
}

impl UseOptions {
    pub fn global(middleware: Vec<Interceptor>) -> Self {
        Self {
            middleware,
            ..Self::default()
        }
    }

    pub fn mount(prefix: &str, router: Router) -> Self {
        Self {
            prefix: Some(prefix.to_string()),
            router: Some(router),
            ..Self::default()
        }
    }

    pub fn with_middleware(mut self, middleware: Vec<Interceptor>) -> Self {
        self.middleware.extend(middleware);
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    /// The next not-yet-placed root route.
    Root,
    /// `mounts[i]`.
    Mount(usize),
}

/// Application under construction.
pub struct App {
    config: AppConfig,
    headers: ResponseHeaders,
    root: Router,
    mounts: Vec<(String, Router)>,
    order: Vec<Slot>,
    global: Vec<SharedMiddleware>,
    recovery: Vec<SharedRecovery>,
    scoped: Vec<(String, Vec<SharedMiddleware>)>,
    body_parser: Option<Arc<dyn BodyParser>>,
    static_files: Option<Arc<dyn StaticFiles>>,
    viewer: Option<Arc<dyn Viewer>>,
}

macro_rules! app_verbs {
    ($($name:ident, $with:ident => $method:expr;)*) => {
        $(
            #[doc = concat!("Register a `", stringify!($method), "` handler on the root router.")]
            pub fn $name(&mut self, path: &str, handler: SharedHandler) -> Result<&mut Self, DispatchError> {
                self.on($method, path, Vec::new(), handler)
            }

            #[doc = concat!("Register a `", stringify!($method), "` handler with verb middleware on the root router.")]
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

impl App {
    /// A new application. The default response-header middleware is the
    /// first global middleware.
    pub fn new(config: AppConfig) -> Self {
        let headers = ResponseHeaders::from_config(&config.headers);
        let mut global = Vec::new();
        if !headers.is_empty() {
            global.push(headers.clone().into_middleware());
        }

        Self {
            config,
            headers,
            root: Router::new(),
            mounts: Vec::new(),
            order: Vec::new(),
            global,
            recovery: Vec::new(),
            scoped: Vec::new(),
            body_parser: None,
            static_files: None,
            viewer: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Register `handler` for `method` at `path` on the root router.
    pub fn on(
        &mut self,
        method: Method,
        path: &str,
        middleware: Vec<Interceptor>,
        handler: SharedHandler,
    ) -> Result<&mut Self, DispatchError> {
        let fresh = !self.root.contains(path);
        self.root.on(method, path, middleware, handler)?;
        if fresh {
            self.order.push(Slot::Root);
        }
        Ok(self)
    }

    /// Fluent route on the root router; see [`Router::route`].
    pub fn route(
        &mut self,
        path: &str,
        shared: Vec<Interceptor>,
    ) -> Result<&mut RouteBuilder, DispatchError> {
        let fresh = !self.root.contains(path);
        let route = self.root.route(path, shared)?;
        if fresh {
            self.order.push(Slot::Root);
        }
        Ok(route)
    }

    /// Global middleware, prefix middleware and router mounting.
    pub fn use_with(&mut self, options: UseOptions) -> Result<&mut Self, DispatchError> {
        let UseOptions {
            prefix,
            middleware,
            router,
        } = options;

        if prefix.is_none() && router.is_none() {
            for interceptor in middleware {
                match interceptor {
                    Interceptor::Success(mw) => self.global.push(mw),
                    Interceptor::Recovery(rc) => self.recovery.push(rc),
                }
            }
            return Ok(self);
        }

        let prefix = normalize_prefix(prefix.as_deref().unwrap_or("/"));
        let middleware = success_only(middleware)?;
        if !middleware.is_empty() {
            self.scoped.push((prefix.clone(), middleware));
        }
        if let Some(router) = router {
            tracing::debug!(prefix = %prefix, routes = router.len(), "Router mounted");
            self.order.push(Slot::Mount(self.mounts.len()));
            self.mounts.push((prefix, router));
        }
        Ok(self)
    }

    /// Global form of [`App::use_with`].
    pub fn use_middleware(&mut self, middleware: Vec<Interceptor>) -> Result<&mut Self, DispatchError> {
        self.use_with(UseOptions::global(middleware))
    }

    /// Mount `router` under `prefix`.
    pub fn mount(&mut self, prefix: &str, router: Router) -> Result<&mut Self, DispatchError> {
        self.use_with(UseOptions::mount(prefix, router))
    }

    /// Apply several [`UseOptions`] in order, stopping at the first error.
    pub fn use_many(
        &mut self,
        list: impl IntoIterator<Item = UseOptions>,
    ) -> Result<&mut Self, DispatchError> {
        for options in list {
            self.use_with(options)?;
        }
        Ok(self)
    }

    pub fn with_body_parser(&mut self, parser: impl BodyParser) -> &mut Self {
        self.body_parser = Some(Arc::new(parser));
        self
    }

    pub fn with_static_files(&mut self, files: impl StaticFiles) -> &mut Self {
        self.static_files = Some(Arc::new(files));
        self
    }

    pub fn with_viewer(&mut self, viewer: impl Viewer) -> &mut Self {
        self.viewer = Some(Arc::new(viewer));
        self
    }

    fn mount_point(&self, prefix: &str) -> MountPoint {
        let mut mount = MountPoint::new(prefix, Vec::new());
        for (scope, middleware) in &self.scoped {
            if scope == prefix {
                mount.extend(middleware.iter().cloned());
            }
        }
        mount
    }

    /// Merge every route's stack and freeze the application.
    pub fn build(self) -> Result<Dispatcher, DispatchError> {
        let status = self.config.dispatch.handler_failure_status;
        let handler_failure_status = StatusCode::from_u16(status).map_err(|e| {
            DispatchError::Fatal(format!("invalid handler failure status {status}: {e}"))
        })?;

        let root_mount = self.mount_point("");
        let mount_points: Vec<MountPoint> = self
            .mounts
            .iter()
            .map(|(prefix, _)| self.mount_point(prefix))
            .collect();

        let App {
            headers,
            root,
            mounts,
            order,
            global,
            recovery,
            body_parser,
            static_files,
            viewer,
            ..
        } = self;

        let mut routers: Vec<Option<Router>> = mounts.into_iter().map(|(_, r)| Some(r)).collect();
        let mut root_routes = root.into_builders().into_iter();
        let mut table = RouteTable::new();
        let mut place = |mut route: RouteBuilder, mount: &MountPoint| -> Result<(), DispatchError> {
            if !mount.prefix().is_empty() {
                route.set_prefix(mount.prefix())?;
            }
            route
                .add_to_stack(global.iter().cloned())
                .add_to_stack(mount.middleware().iter().cloned())
                .attach_mount(mount.clone());
            table.insert(route.merge_stacks());
            Ok(())
        };

        for slot in order {
            match slot {
                Slot::Root => {
                    if let Some(route) = root_routes.next() {
                        place(route, &root_mount)?;
                    }
                }
                Slot::Mount(index) => {
                    let Some(router) = routers.get_mut(index).and_then(Option::take) else {
                        continue;
                    };
                    for route in router.into_builders() {
                        place(route, &mount_points[index])?;
                    }
                }
            }
        }

        tracing::info!(
            routes = table.len(),
            global = global.len(),
            recovery = recovery.len(),
            "Route table built"
        );

        Ok(Dispatcher::new(
            global,
            headers,
            table,
            ErrorChannel::new(recovery, handler_failure_status),
            body_parser,
            static_files,
            viewer,
        ))
    }

    app_verbs! {
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

impl Default for App {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("root", &self.root)
            .field("mounts", &self.mounts)
            .field("global", &self.global.len())
            .field("recovery", &self.recovery.len())
            .finish()
    }
}
