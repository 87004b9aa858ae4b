//! Error channel.
//!
//! Entered whenever the success chain returns an error. Recovery
//! interceptors run in registration order; each may answer the request,
//! pass the failure (or a replacement) on with `next.run(..)`, or return an
//! error. The terminal fallback writes the failure's status and message.
//!
//! A failure escaping the channel itself is also answered by the fallback,
//! so a failed request always receives a response.

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};

use crate::error::{DispatchError, Outcome};
use crate::http::{Request, Response};
use crate::pipeline::chain::guarded;
use crate::pipeline::middleware::SharedRecovery;

/// Continuation handed to each recovery interceptor.
pub struct RecoveryNext<'a> {
    chain: &'a [SharedRecovery],
    cursor: usize,
    handler_failure_status: StatusCode,
}

impl<'a> RecoveryNext<'a> {
    /// Hand `err` to the next recovery interceptor, or to the fallback once
    /// none are left.
    pub async fn run(self, err: DispatchError, req: &mut Request, res: &mut Response) -> Outcome {
        let RecoveryNext {
            chain,
            cursor,
            handler_failure_status,
        } = self;

        match chain.get(cursor) {
            Some(step) => {
                let next = RecoveryNext {
                    chain,
                    cursor: cursor + 1,
                    handler_failure_status,
                };
                guarded(async move { step.recover(err, req, res, next).await }).await
            }
            None => {
                respond(&err, res, handler_failure_status);
                Ok(())
            }
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

/// Recovery interceptors plus the fallback responder.
pub struct ErrorChannel {
    interceptors: Vec<SharedRecovery>,
    handler_failure_status: StatusCode,
}

impl ErrorChannel {
    pub fn new(interceptors: Vec<SharedRecovery>, handler_failure_status: StatusCode) -> Self {
        Self {
            interceptors,
            handler_failure_status,
        }
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Status used for a `HandlerFailure` that carries none.
    pub fn handler_failure_status(&self) -> StatusCode {
        self.handler_failure_status
    }

    /// Drive `err` through the channel.
    pub async fn dispatch(&self, err: DispatchError, req: &mut Request, res: &mut Response) {
        let next = RecoveryNext {
            chain: &self.interceptors,
            cursor: 0,
            handler_failure_status: self.handler_failure_status,
        };
        if let Err(escaped) = next.run(err, &mut *req, &mut *res).await {
            tracing::warn!(
                request_id = %req.request_id(),
                error = %escaped,
                "Failure escaped the error channel"
            );
            respond(&escaped, res, self.handler_failure_status);
        }
    }
}

/// Fallback responder: status from the failure, message as the body.
pub fn respond(err: &DispatchError, res: &mut Response, handler_failure_status: StatusCode) {
    if res.sent() {
        tracing::debug!(error = %err, "Response already sent, fallback skipped");
        return;
    }
    res.status(err.status_or(handler_failure_status))
        .set_header(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))
        .send(err.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::middleware::{recovery, Interceptor};
    use axum::http::{Method, Uri};

    fn as_recovery(interceptor: Interceptor) -> SharedRecovery {
        match interceptor {
            Interceptor::Recovery(r) => r,
            Interceptor::Success(_) => unreachable!("built with recovery()"),
        }
    }

    fn request() -> (Request, Response) {
        let req = Request::new(Method::GET, Uri::from_static("/missing"));
        let res = Response::for_request(&req);
        (req, res)
    }

    #[tokio::test]
    async fn test_empty_channel_uses_fallback() {
        let channel = ErrorChannel::new(Vec::new(), StatusCode::INTERNAL_SERVER_ERROR);
        let (mut req, mut res) = request();

        channel
            .dispatch(DispatchError::NotFound { path: "/missing".into() }, &mut req, &mut res)
            .await;

        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert!(String::from_utf8_lossy(res.body()).contains("NOT FOUND: /missing"));
    }

    #[tokio::test]
    async fn test_handler_failure_default_status() {
        let channel = ErrorChannel::new(Vec::new(), StatusCode::NOT_FOUND);
        let (mut req, mut res) = request();
        channel
            .dispatch(DispatchError::handler("boom"), &mut req, &mut res)
            .await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_interceptors_run_in_order_before_fallback() {
        let first = as_recovery(recovery(|err, req, res, next| {
            Box::pin(async move {
                res.set_header(
                    axum::http::HeaderName::from_static("x-first"),
                    HeaderValue::from_static("1"),
                );
                next.run(err, req, res).await
            })
        }));
        let second = as_recovery(recovery(|err, req, res, next| {
            Box::pin(async move {
                assert_eq!(res.header("x-first"), Some("1"));
                let replaced = DispatchError::with_status(StatusCode::IM_A_TEAPOT, format!("wrapped: {err}"));
                next.run(replaced, req, res).await
            })
        }));
        let channel = ErrorChannel::new(vec![first, second], StatusCode::INTERNAL_SERVER_ERROR);
        let (mut req, mut res) = request();

        channel
            .dispatch(DispatchError::handler("inner"), &mut req, &mut res)
            .await;

        assert_eq!(res.status_code(), StatusCode::IM_A_TEAPOT);
        assert_eq!(res.body().as_ref(), b"wrapped: inner");
    }

    #[tokio::test]
    async fn test_interceptor_can_answer() {
        let answer = as_recovery(recovery(|_err, _req, res, _next| {
            Box::pin(async move {
                res.status(StatusCode::SERVICE_UNAVAILABLE).send("try later");
                Ok(())
            })
        }));
        let channel = ErrorChannel::new(vec![answer], StatusCode::INTERNAL_SERVER_ERROR);
        let (mut req, mut res) = request();
        channel
            .dispatch(DispatchError::handler("down"), &mut req, &mut res)
            .await;
        assert_eq!(res.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(res.body().as_ref(), b"try later");
    }

    #[tokio::test]
    async fn test_panicking_interceptor_still_gets_response() {
        let broken = as_recovery(recovery(|_err, _req, _res, _next| panic!("recovery broke")));
        let channel = ErrorChannel::new(vec![broken], StatusCode::INTERNAL_SERVER_ERROR);
        let (mut req, mut res) = request();
        channel
            .dispatch(DispatchError::handler("first"), &mut req, &mut res)
            .await;
        assert!(res.sent());
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body().as_ref(), b"recovery broke");
    }
}
