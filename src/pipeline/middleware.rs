//! Interceptor kinds and closure adapters.
//!
//! Success middleware, terminal handlers and recovery interceptors are three
//! separate traits. Which chain an interceptor joins is decided by the
//! `Interceptor` variant chosen at registration, never by inspecting the
//! callable.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::{DispatchError, Outcome};
use crate::http::{Request, Response};
use crate::pipeline::chain::Next;
use crate::pipeline::recovery::RecoveryNext;

/// A step of the success chain. It either calls `next.run(..)`, ends the
/// response itself, or returns an error to divert into the error channel.
pub trait Middleware: Send + Sync + 'static {
    fn handle<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
        next: Next<'a>,
    ) -> BoxFuture<'a, Outcome>;
}

/// Terminal handler invoked once a route's stack is exhausted.
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, req: &'a mut Request, res: &'a mut Response) -> BoxFuture<'a, Outcome>;
}

/// A step of the error channel.
pub trait Recovery: Send + Sync + 'static {
    fn recover<'a>(
        &'a self,
        err: DispatchError,
        req: &'a mut Request,
        res: &'a mut Response,
        next: RecoveryNext<'a>,
    ) -> BoxFuture<'a, Outcome>;
}

pub type SharedMiddleware = Arc<dyn Middleware>;
pub type SharedHandler = Arc<dyn Handler>;
pub type SharedRecovery = Arc<dyn Recovery>;

/// An interceptor tagged with the chain it belongs to.
#[derive(Clone)]
pub enum Interceptor {
    Success(SharedMiddleware),
    Recovery(SharedRecovery),
}

impl Interceptor {
    pub fn success(middleware: impl Middleware) -> Self {
        Interceptor::Success(Arc::new(middleware))
    }

    pub fn recover(recovery: impl Recovery) -> Self {
        Interceptor::Recovery(Arc::new(recovery))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Interceptor::Success(_) => "success middleware",
            Interceptor::Recovery(_) => "recovery interceptor",
        }
    }

    /// Unwrap a success interceptor; a recovery interceptor here is a
    /// registration error.
    pub fn into_success(self) -> Result<SharedMiddleware, DispatchError> {
        match self {
            Interceptor::Success(mw) => Ok(mw),
            other => Err(DispatchError::invalid_middleware(
                "success middleware",
                other.kind(),
            )),
        }
    }
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}

/// Check that every interceptor in `list` is success middleware.
pub fn success_only(
    list: impl IntoIterator<Item = Interceptor>,
) -> Result<Vec<SharedMiddleware>, DispatchError> {
    list.into_iter().map(Interceptor::into_success).collect()
}

struct MiddlewareFn<F>(F);

impl<F> Middleware for MiddlewareFn<F>
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response, Next<'a>) -> BoxFuture<'a, Outcome>
        + Send
        + Sync
        + 'static,
{
    fn handle<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
        next: Next<'a>,
    ) -> BoxFuture<'a, Outcome> {
        (self.0)(req, res, next)
    }
}

struct HandlerFn<F>(F);

impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, Outcome>
        + Send
        + Sync
        + 'static,
{
    fn call<'a>(&'a self, req: &'a mut Request, res: &'a mut Response) -> BoxFuture<'a, Outcome> {
        (self.0)(req, res)
    }
}

struct RecoveryFn<F>(F);

impl<F> Recovery for RecoveryFn<F>
where
    F: for<'a> Fn(DispatchError, &'a mut Request, &'a mut Response, RecoveryNext<'a>) -> BoxFuture<'a, Outcome>
        + Send
        + Sync
        + 'static,
{
    fn recover<'a>(
        &'a self,
        err: DispatchError,
        req: &'a mut Request,
        res: &'a mut Response,
        next: RecoveryNext<'a>,
    ) -> BoxFuture<'a, Outcome> {
        (self.0)(err, req, res, next)
    }
}

/// Success middleware from a closure.
///
/// ```ignore
/// let auth = middleware(|req, res, next| Box::pin(async move {
///     if req.header("authorization").is_none() {
///         res.status(StatusCode::UNAUTHORIZED).send("unauthorized");
///         return Ok(());
///     }
///     next.run(req, res).await
/// }));
/// ```
pub fn middleware<F>(f: F) -> Interceptor
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response, Next<'a>) -> BoxFuture<'a, Outcome>
        + Send
        + Sync
        + 'static,
{
    Interceptor::Success(Arc::new(MiddlewareFn(f)))
}

/// Terminal handler from a closure.
pub fn handler<F>(f: F) -> SharedHandler
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, Outcome>
        + Send
        + Sync
        + 'static,
{
    Arc::new(HandlerFn(f))
}

/// Recovery interceptor from a closure.
pub fn recovery<F>(f: F) -> Interceptor
where
    F: for<'a> Fn(DispatchError, &'a mut Request, &'a mut Response, RecoveryNext<'a>) -> BoxFuture<'a, Outcome>
        + Send
        + Sync
        + 'static,
{
    Interceptor::Recovery(Arc::new(RecoveryFn(f)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_only_rejects_recovery() {
        let list = vec![
            middleware(|req, res, next| Box::pin(async move { next.run(req, res).await })),
            recovery(|err, req, res, next| Box::pin(async move { next.run(err, req, res).await })),
        ];
        let Err(err) = success_only(list) else {
            panic!("recovery interceptor accepted as success middleware");
        };
        assert!(matches!(
            err,
            DispatchError::InvalidMiddlewareType {
                expected: "success middleware",
                got: "recovery interceptor"
            }
        ));
    }

    #[test]
    fn test_success_only_keeps_order() {
        let list = vec![
            middleware(|req, res, next| Box::pin(async move { next.run(req, res).await })),
            middleware(|req, res, next| Box::pin(async move { next.run(req, res).await })),
        ];
        assert_eq!(success_only(list).unwrap().len(), 2);
    }
}
