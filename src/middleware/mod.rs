//! Middleware layer.
//!
//! Middleware wraps a handler and is the right place for cross-cutting
//! concerns: structured tracing, request-id injection, panic recovery,
//! authentication-header inspection, error interception.
//!
//! A [`Middleware`] is a pure transform from handler to handler. Ordered
//! lists fold into one transform where the **first** entry is the
//! **outermost** wrapper:
//!
//! ```text
//! fold([a, b, c]).then(h)  ==  a.then(b.then(c.then(h)))
//!
//! a-pre → b-pre → c-pre → h → c-post → b-post → a-post
//! ```
//!
//! The outermost layer sees the request first and the final outcome last,
//! which is where request logging belongs.
//!
//! Built-in middleware:
//! - [`trace`] — per-request span with method, path, status, latency
//! - [`request_id`] — `x-request-id` propagation / generation
//! - [`recover`] — panics become failure values
//! - [`catch`] — intercept, translate or swallow failures

mod catch;
mod recover;
mod request_id;
mod trace;

use std::fmt;
use std::sync::Arc;

pub use catch::catch;
pub use recover::{recover, Panicked};
pub use request_id::{request_id, RequestId, X_REQUEST_ID};
pub use trace::trace;

use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::request::Request;
use crate::response::ResponseWriter;

/// A transform that wraps a [`Handler`] into a new one.
///
/// Cheap to clone. Any state a middleware needs (a logger, a token store) is
/// captured when it is constructed; the mux never mutates it.
#[derive(Clone)]
pub struct Middleware(Arc<dyn Fn(BoxedHandler) -> BoxedHandler + Send + Sync>);

impl Middleware {
    /// Builds a middleware from a raw handler-to-handler transform.
    pub fn new<F>(wrap: F) -> Self
    where
        F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
    {
        Self(Arc::new(wrap))
    }

    /// The transform that returns its handler unchanged.
    pub fn identity() -> Self {
        Self::new(|next| next)
    }

    /// Wraps `handler` with this middleware.
    pub fn then(&self, handler: BoxedHandler) -> BoxedHandler {
        (self.0)(handler)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Middleware")
    }
}

/// Folds an ordered list of middleware into one, first entry outermost.
///
/// An empty list folds to [`Middleware::identity`].
pub fn fold(middleware: impl IntoIterator<Item = Middleware>) -> Middleware {
    let chain: Vec<Middleware> = middleware.into_iter().collect();
    if chain.is_empty() {
        return Middleware::identity();
    }

    Middleware::new(move |handler| {
        chain.iter().rev().fold(handler, |inner, m| m.then(inner))
    })
}

// ── Around-style middleware ───────────────────────────────────────────────────

/// Builds a middleware from a function that receives the inner handler as `next`.
///
/// Do the pre-work, call `next.serve(w, req).await`, do the post-work, return
/// the outcome (or a different one):
///
/// ```rust
/// use trymux::middleware;
///
/// let server_header = middleware::from_fn(|w, req, next| {
///     Box::pin(async move {
///         let outcome = next.serve(w, req).await;
///         w.header("server", "trymux");
///         outcome
///     })
/// });
/// # let _ = server_header;
/// ```
pub fn from_fn<F>(f: F) -> Middleware
where
    F: for<'a> Fn(&'a mut ResponseWriter, &'a mut Request, &'a dyn Handler) -> BoxFuture<'a>
        + Send
        + Sync
        + 'static,
{
    let f = Arc::new(f);
    Middleware::new(move |next| Arc::new(Around { f: Arc::clone(&f), next }) as BoxedHandler)
}

struct Around<F> {
    f: Arc<F>,
    next: BoxedHandler,
}

impl<F> Handler for Around<F>
where
    F: for<'a> Fn(&'a mut ResponseWriter, &'a mut Request, &'a dyn Handler) -> BoxFuture<'a>
        + Send
        + Sync
        + 'static,
{
    fn serve<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a mut Request) -> BoxFuture<'a> {
        (self.f)(w, req, self.next.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{boxed, handler_fn};
    use http::{HeaderValue, Method, Uri};

    fn tracer(pre: &'static str, post: &'static str) -> Middleware {
        from_fn(move |w, req, next| {
            Box::pin(async move {
                w.headers_mut().append("x-middleware", HeaderValue::from_static(pre));
                let outcome = next.serve(w, req).await;
                w.headers_mut().append("x-middleware", HeaderValue::from_static(post));
                outcome
            })
        })
    }

    fn leaf() -> BoxedHandler {
        boxed(handler_fn(|w, _req| {
            Box::pin(async move {
                w.headers_mut().append("x-middleware", HeaderValue::from_static("h"));
                Ok(())
            })
        }))
    }

    async fn trace_of(handler: BoxedHandler) -> String {
        let mut w = ResponseWriter::new();
        let mut req = Request::new(Method::GET, Uri::from_static("/"));
        handler.serve(&mut w, &mut req).await.unwrap();

        w.headers()
            .get_all("x-middleware")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn fold_runs_first_middleware_outermost() {
        let chain = fold([tracer("A{", "}"), tracer("B(", ")"), tracer("C[", "]")]);
        assert_eq!(trace_of(chain.then(leaf())).await, "A{B(C[h])}");
    }

    #[tokio::test]
    async fn fold_matches_manual_nesting() {
        let (a, b, c) = (tracer("a<", ">"), tracer("b<", ">"), tracer("c<", ">"));

        let folded = fold([a.clone(), b.clone(), c.clone()]).then(leaf());
        let nested = a.then(b.then(c.then(leaf())));

        assert_eq!(trace_of(folded).await, trace_of(nested).await);
    }

    #[tokio::test]
    async fn empty_fold_is_identity() {
        let chain = fold(Vec::new());
        assert_eq!(trace_of(chain.then(leaf())).await, "h");

        let handler = leaf();
        let wrapped = Middleware::identity().then(Arc::clone(&handler));
        assert!(Arc::ptr_eq(&handler, &wrapped));
    }

    #[tokio::test]
    async fn middleware_can_short_circuit() {
        let deny = from_fn(|w, _req, _next| {
            Box::pin(async move {
                w.set_status(http::StatusCode::FORBIDDEN);
                Ok(())
            })
        });

        let mut w = ResponseWriter::new();
        let mut req = Request::new(Method::GET, Uri::from_static("/"));
        fold([deny]).then(leaf()).serve(&mut w, &mut req).await.unwrap();

        assert_eq!(w.status(), http::StatusCode::FORBIDDEN);
        assert!(w.headers().get("x-middleware").is_none(), "inner handler must not run");
    }
}
