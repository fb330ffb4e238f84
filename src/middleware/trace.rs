//! Per-request tracing span.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, info_span, warn, Instrument};

use super::Middleware;
use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::request::Request;
use crate::response::ResponseWriter;

/// Opens an `info` span named `request` with `method` and `path` around the
/// inner chain, then logs status and latency on success, or the error and
/// latency on failure. The outcome passes through unchanged.
///
/// Register it first in the global list so it observes everything else.
pub fn trace() -> Middleware {
    Middleware::new(|next| Arc::new(Trace { next }) as BoxedHandler)
}

struct Trace {
    next: BoxedHandler,
}

impl Handler for Trace {
    fn serve<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a mut Request) -> BoxFuture<'a> {
        let span = info_span!("request", method = %req.method(), path = %req.path());

        Box::pin(
            async move {
                let started = Instant::now();
                let outcome = self.next.serve(w, req).await;
                let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

                match &outcome {
                    Ok(()) => info!(status = w.status().as_u16(), latency_ms, "request completed"),
                    Err(err) => warn!(error = %err, latency_ms, "request failed"),
                }
                outcome
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::handler::{boxed, handler_fn};
    use http::{Method, StatusCode, Uri};

    #[derive(Debug, thiserror::Error)]
    #[error("upstream timed out")]
    struct Timeout;

    #[tokio::test]
    async fn passes_success_through() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let handler = trace().then(boxed(handler_fn(|w, _req| {
            Box::pin(async move {
                w.set_status(StatusCode::NO_CONTENT);
                Ok(())
            })
        })));

        let mut w = ResponseWriter::new();
        let mut req = Request::new(Method::DELETE, Uri::from_static("/users/1"));
        handler.serve(&mut w, &mut req).await.unwrap();

        assert_eq!(w.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn passes_failure_through() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let handler = trace().then(boxed(handler_fn(|_w, _req| {
            Box::pin(async move { Err(BoxError::from(Timeout)) })
        })));

        let mut w = ResponseWriter::new();
        let mut req = Request::new(Method::GET, Uri::from_static("/slow"));
        let err = handler.serve(&mut w, &mut req).await.unwrap_err();

        assert!(err.is::<Timeout>());
    }
}
