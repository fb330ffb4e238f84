//! Handler trait and the function adapter.
//!
//! # How fallible handlers are stored
//!
//! A handler receives the response sink and the request by mutable borrow and
//! resolves to `Ok(())` (handled) or `Err(e)` (failed with `e`). It writes its
//! response through the [`ResponseWriter`]; the error value is left for the
//! enclosing middleware and, ultimately, the mux's last-resort hook.
//!
//! The router stores handlers of *different* concrete types side by side, so
//! every registered handler is erased to a [`BoxedHandler`]:
//!
//! ```text
//! handler_fn(|w, req| Box::pin(async move { … }))   ← user writes this
//!        ↓ mux.register("GET /", handler, [])
//! Arc::new(HandlerFn(closure))                     ← heap-allocated wrapper
//!        ↓ wrapped by global ∘ local middleware, stored once
//! handler.serve(&mut w, &mut req) at request time  ← one vtable call per layer
//! ```
//!
//! The returned future borrows the writer and the request for `'a`, which is
//! why closures return a [`BoxFuture<'a>`] instead of being plain `async fn`s:
//! the borrow has to be named in the signature.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::BoxError;
use crate::request::Request;
use crate::response::ResponseWriter;

/// What a handler resolves to.
pub type Outcome = Result<(), BoxError>;

/// A heap-allocated, type-erased handler future borrowing its arguments for `'a`.
///
/// `Send` lets tokio move the request task across worker threads.
pub type BoxFuture<'a> = Pin<Box<dyn Future<Output = Outcome> + Send + 'a>>;

/// A type-erased handler shared across concurrent requests.
///
/// Cloning is one atomic increment; the handler itself is never copied.
pub type BoxedHandler = Arc<dyn Handler>;

/// A unit of request handling that can fail.
///
/// Implement it on your own types, or wrap a closure with [`handler_fn`].
///
/// ```rust
/// use trymux::{BoxFuture, Handler, Request, ResponseWriter};
///
/// struct Greeting(&'static str);
///
/// impl Handler for Greeting {
///     fn serve<'a>(&'a self, w: &'a mut ResponseWriter, _req: &'a mut Request) -> BoxFuture<'a> {
///         Box::pin(async move {
///             w.text(self.0);
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    fn serve<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a mut Request) -> BoxFuture<'a>;
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn serve<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a mut Request) -> BoxFuture<'a> {
        (**self).serve(w, req)
    }
}

/// Erases a handler so it can be stored or wrapped by a [`Middleware`](crate::Middleware).
pub fn boxed(handler: impl Handler) -> BoxedHandler {
    Arc::new(handler)
}

// ── Function adapter ──────────────────────────────────────────────────────────

/// Newtype wrapper that lets a plain function act as a [`Handler`].
///
/// Build one with [`handler_fn`].
#[derive(Clone, Copy)]
pub struct HandlerFn<F>(F);

/// Wraps a function into a [`Handler`].
///
/// ```rust
/// use trymux::{handler_fn, StatusCode};
///
/// let created = handler_fn(|w, _req| {
///     Box::pin(async move {
///         w.set_status(StatusCode::CREATED);
///         Ok(())
///     })
/// });
/// # let _ = created;
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(&'a mut ResponseWriter, &'a mut Request) -> BoxFuture<'a> + Send + Sync + 'static,
{
    HandlerFn(f)
}

impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut ResponseWriter, &'a mut Request) -> BoxFuture<'a> + Send + Sync + 'static,
{
    fn serve<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a mut Request) -> BoxFuture<'a> {
        (self.0)(w, req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode, Uri};

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    fn request() -> Request {
        Request::new(Method::GET, Uri::from_static("/"))
    }

    #[tokio::test]
    async fn handler_fn_forwards_to_the_function() {
        let h = handler_fn(|w, _req| {
            Box::pin(async move {
                w.set_status(StatusCode::ACCEPTED);
                Ok(())
            })
        });

        let mut w = ResponseWriter::new();
        let outcome = h.serve(&mut w, &mut request()).await;

        assert!(outcome.is_ok());
        assert_eq!(w.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn failures_come_back_as_values() {
        let h = boxed(handler_fn(|_w, _req| Box::pin(async move { Err(BoxError::from(Boom)) })));

        let mut w = ResponseWriter::new();
        let err = h.serve(&mut w, &mut request()).await.unwrap_err();

        assert!(err.downcast_ref::<Boom>().is_some());
        assert_eq!(err.to_string(), "boom");
        assert_eq!(w.status(), StatusCode::OK, "a failing handler writes nothing by itself");
    }
}
