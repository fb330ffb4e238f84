//! Panic recovery.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::error;

use super::Middleware;
use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::request::Request;
use crate::response::ResponseWriter;

/// The failure value a recovered panic turns into.
#[derive(Debug, thiserror::Error)]
#[error("handler panicked: {message}")]
pub struct Panicked {
    pub message: String,
}

/// Catches panics raised inside the inner chain and returns them as a
/// [`Panicked`] failure, so the last-resort hook answers instead of the
/// connection being dropped.
pub fn recover() -> Middleware {
    Middleware::new(|next| Arc::new(Recover { next }) as BoxedHandler)
}

struct Recover {
    next: BoxedHandler,
}

impl Handler for Recover {
    fn serve<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a mut Request) -> BoxFuture<'a> {
        Box::pin(async move {
            match AssertUnwindSafe(self.next.serve(w, req)).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(payload) => {
                    let message = panic_message(&*payload);
                    error!(panic = %message, "recovered from handler panic");
                    Err(Panicked { message }.into())
                }
            }
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{boxed, handler_fn};
    use http::{Method, Uri};

    #[tokio::test]
    async fn panic_becomes_failure() {
        let handler = recover().then(boxed(handler_fn(|_w, req| {
            Box::pin(async move {
                if req.path() == "/explode" {
                    panic!("kaboom");
                }
                Ok(())
            })
        })));

        let mut w = ResponseWriter::new();
        let mut req = Request::new(Method::GET, Uri::from_static("/explode"));
        let err = handler.serve(&mut w, &mut req).await.unwrap_err();

        let panicked = err.downcast_ref::<Panicked>().expect("a Panicked failure");
        assert_eq!(panicked.message, "kaboom");
        assert_eq!(err.to_string(), "handler panicked: kaboom");
    }

    #[tokio::test]
    async fn success_is_untouched() {
        let handler = recover().then(boxed(handler_fn(|w, _req| {
            Box::pin(async move {
                w.text("fine");
                Ok(())
            })
        })));

        let mut w = ResponseWriter::new();
        let mut req = Request::new(Method::GET, Uri::from_static("/"));
        handler.serve(&mut w, &mut req).await.unwrap();

        assert_eq!(w.body(), b"fine");
    }

    #[test]
    fn formats_string_payloads() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*owned), "owned");

        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(&*other), "unknown panic payload");
    }
}
