//! Continuation builder.
//!
//! `Chain` pairs an ordered stack with its terminal handler; every dispatch
//! starts a fresh `Next` at cursor zero. Each `Next` is consumed when it
//! advances, so one request's chain can never run the same step twice or
//! two steps concurrently.
//!
//! A panic raised by a step, whether before or after its future is created,
//! is caught at the frame that invoked the step and becomes a
//! `HandlerFailure` for the caller to see like any other error.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;

use crate::error::{DispatchError, Outcome};
use crate::http::{Request, Response};
use crate::pipeline::middleware::{Handler, SharedMiddleware};

/// Driver for one stack + handler pair.
#[derive(Clone, Copy)]
pub struct Chain<'a> {
    stack: &'a [SharedMiddleware],
    handler: &'a dyn Handler,
}

impl<'a> Chain<'a> {
    pub fn new(stack: &'a [SharedMiddleware], handler: &'a dyn Handler) -> Self {
        Self { stack, handler }
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Run the stack from the start, then the handler.
    pub async fn dispatch(&self, req: &mut Request, res: &mut Response) -> Outcome {
        Next::new(self.stack, self.handler).run(req, res).await
    }
}

/// The continuation handed to each middleware.
pub struct Next<'a> {
    stack: &'a [SharedMiddleware],
    cursor: usize,
    handler: &'a dyn Handler,
}

impl<'a> Next<'a> {
    pub(crate) fn new(stack: &'a [SharedMiddleware], handler: &'a dyn Handler) -> Self {
        Self {
            stack,
            cursor: 0,
            handler,
        }
    }

    /// Index of the step this continuation will run.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Advance to the next middleware, or to the handler once the stack is
    /// exhausted.
    pub async fn run(self, req: &mut Request, res: &mut Response) -> Outcome {
        let Next {
            stack,
            cursor,
            handler,
        } = self;

        match stack.get(cursor) {
            Some(step) => {
                let next = Next {
                    stack,
                    cursor: cursor + 1,
                    handler,
                };
                guarded(async move { step.handle(req, res, next).await }).await
            }
            None => guarded(async move { handler.call(req, res).await }).await,
        }
    }

    /// Stop the success chain and divert `err` into the error channel.
    pub fn fail(self, err: DispatchError) -> Outcome {
        Err(err)
    }

    /// Advance when `err` is `None`, otherwise fail with it.
    pub async fn advance(
        self,
        req: &mut Request,
        res: &mut Response,
        err: Option<DispatchError>,
    ) -> Outcome {
        match err {
            Some(err) => self.fail(err),
            None => self.run(req, res).await,
        }
    }
}

/// Poll `step`, turning a panic into a `HandlerFailure`.
pub(crate) async fn guarded<F>(step: F) -> Outcome
where
    F: Future<Output = Outcome>,
{
    match AssertUnwindSafe(step).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(panic = %message, "interceptor panicked");
            Err(DispatchError::handler(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "interceptor panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::middleware::{handler, middleware, Interceptor, SharedHandler};
    use axum::http::{Method, StatusCode, Uri};

    #[derive(Clone, Default)]
    struct Trail(Vec<&'static str>);

    fn mark(name: &'static str) -> SharedMiddleware {
        let step = middleware(move |req, res, next| {
            Box::pin(async move {
                if let Some(trail) = req.extensions_mut().get_mut::<Trail>() {
                    trail.0.push(name);
                }
                next.run(req, res).await
            })
        });
        step.into_success().unwrap()
    }

    fn finish() -> SharedHandler {
        handler(|req, res| {
            Box::pin(async move {
                if let Some(trail) = req.extensions_mut().get_mut::<Trail>() {
                    trail.0.push("handler");
                }
                res.send("done");
                Ok(())
            })
        })
    }

    fn request() -> Request {
        let mut req = Request::new(Method::GET, Uri::from_static("/"));
        req.extensions_mut().insert(Trail::default());
        req
    }

    fn trail(req: &Request) -> Vec<&'static str> {
        req.extensions().get::<Trail>().cloned().unwrap_or_default().0
    }

    #[tokio::test]
    async fn test_runs_stack_in_order_then_handler() {
        let stack = vec![mark("a"), mark("b"), mark("c")];
        let done = finish();
        let chain = Chain::new(&stack, done.as_ref());

        let mut req = request();
        let mut res = Response::for_request(&req);
        chain.dispatch(&mut req, &mut res).await.unwrap();

        assert_eq!(trail(&req), vec!["a", "b", "c", "handler"]);
        assert!(res.sent());
    }

    #[tokio::test]
    async fn test_empty_stack_runs_handler() {
        let done = finish();
        let chain = Chain::new(&[], done.as_ref());
        assert!(chain.is_empty());

        let mut req = request();
        let mut res = Response::for_request(&req);
        chain.dispatch(&mut req, &mut res).await.unwrap();
        assert_eq!(trail(&req), vec!["handler"]);
    }

    #[tokio::test]
    async fn test_error_skips_remaining_steps() {
        let failing = middleware(|_req, _res, next| {
            Box::pin(async move { next.fail(DispatchError::with_status(StatusCode::FORBIDDEN, "denied")) })
        })
        .into_success()
        .unwrap();
        let stack = vec![mark("a"), failing, mark("never")];
        let done = finish();

        let mut req = request();
        let mut res = Response::for_request(&req);
        let err = Chain::new(&stack, done.as_ref())
            .dispatch(&mut req, &mut res)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "denied");
        assert_eq!(trail(&req), vec!["a"]);
        assert!(!res.sent());
    }

    #[tokio::test]
    async fn test_advance_with_error_does_not_continue() {
        let step = middleware(|req, res, next| {
            Box::pin(async move {
                next.advance(req, res, Some(DispatchError::handler("stop")))
                    .await
            })
        })
        .into_success()
        .unwrap();
        let stack = vec![step, mark("never")];
        let done = finish();

        let mut req = request();
        let mut res = Response::for_request(&req);
        let outcome = Chain::new(&stack, done.as_ref()).dispatch(&mut req, &mut res).await;
        assert!(outcome.is_err());
        assert!(trail(&req).is_empty());
    }

    #[tokio::test]
    async fn test_synchronous_panic_becomes_failure() {
        let exploding: Interceptor = middleware(|_req, _res, _next| panic!("exploded before awaiting"));
        let stack = vec![mark("a"), exploding.into_success().unwrap()];
        let done = finish();

        let mut req = request();
        let mut res = Response::for_request(&req);
        let err = Chain::new(&stack, done.as_ref())
            .dispatch(&mut req, &mut res)
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::HandlerFailure { status: None, .. }));
        assert_eq!(err.to_string(), "exploded before awaiting");
        assert_eq!(trail(&req), vec!["a"]);
    }

    #[tokio::test]
    async fn test_handler_panic_has_same_shape_as_error() {
        fn explode(reason: &str) -> Outcome {
            panic!("{}", reason)
        }
        let exploding = handler(|_req, _res| Box::pin(async move { explode("handler blew up") }));

        let mut req = request();
        let mut res = Response::for_request(&req);
        let err = Chain::new(&[], exploding.as_ref())
            .dispatch(&mut req, &mut res)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::HandlerFailure { .. }));
        assert_eq!(err.to_string(), "handler blew up");
    }

    #[tokio::test]
    async fn test_middleware_can_end_response_without_advancing() {
        let gate = middleware(|_req, res, _next| {
            Box::pin(async move {
                res.status(StatusCode::UNAUTHORIZED).send("unauthorized");
                Ok(())
            })
        })
        .into_success()
        .unwrap();
        let stack = vec![gate, mark("never")];
        let done = finish();

        let mut req = request();
        let mut res = Response::for_request(&req);
        Chain::new(&stack, done.as_ref())
            .dispatch(&mut req, &mut res)
            .await
            .unwrap();
        assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
        assert!(trail(&req).is_empty());
    }

    #[tokio::test]
    async fn test_middleware_observes_downstream_result() {
        let observer = middleware(|req, res, next| {
            Box::pin(async move {
                let outcome = next.run(&mut *req, &mut *res).await;
                if outcome.is_ok() {
                    res.set_header(
                        axum::http::HeaderName::from_static("x-observed"),
                        axum::http::HeaderValue::from_static("yes"),
                    );
                }
                outcome
            })
        })
        .into_success()
        .unwrap();
        let stack = vec![observer];
        let done = handler(|_req, _res| Box::pin(async move { Ok(()) }));

        let mut req = request();
        let mut res = Response::for_request(&req);
        Chain::new(&stack, done.as_ref())
            .dispatch(&mut req, &mut res)
            .await
            .unwrap();
        assert_eq!(res.header("x-observed"), Some("yes"));
    }
}
