//! Request id propagation.
//!
//! Reuses the caller's `x-request-id` when it carries one, generates a UUID v4
//! otherwise. The id lands in the request extensions for handlers and in the
//! response headers for the caller, including on failure responses.

use std::fmt;
use std::sync::Arc;

use http::{HeaderName, HeaderValue};
use uuid::Uuid;

use super::Middleware;
use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::request::Request;
use crate::response::ResponseWriter;

/// The header name for request ids.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Longest inbound id accepted as-is; longer ones are replaced.
const MAX_INBOUND_LEN: usize = 128;

/// A unique identifier for a request, stored in [`Request::extensions`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(Arc<str>);

impl RequestId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Generates a new random id using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(Arc::from(Uuid::new_v4().to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Assigns a [`RequestId`] to every request. Register it near the top of the
/// global list so inner middleware and handlers can read it.
pub fn request_id() -> Middleware {
    Middleware::new(|next| Arc::new(AssignRequestId { next }) as BoxedHandler)
}

struct AssignRequestId {
    next: BoxedHandler,
}

impl Handler for AssignRequestId {
    fn serve<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a mut Request) -> BoxFuture<'a> {
        let id = req
            .header(X_REQUEST_ID.as_str())
            .filter(|id| !id.is_empty() && id.len() <= MAX_INBOUND_LEN)
            .map(RequestId::new)
            .unwrap_or_else(RequestId::generate);

        if let Ok(value) = HeaderValue::from_str(id.as_str()) {
            w.headers_mut().insert(X_REQUEST_ID.clone(), value);
        }
        req.extensions_mut().insert(id);

        self.next.serve(w, req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{boxed, handler_fn};
    use http::{Method, Uri};

    /// Echoes the id the handler sees into the body.
    fn echo() -> BoxedHandler {
        boxed(handler_fn(|w, req| {
            Box::pin(async move {
                let id = req.extensions().get::<RequestId>().map(RequestId::to_string);
                w.text(id.unwrap_or_default());
                Ok(())
            })
        }))
    }

    #[tokio::test]
    async fn reuses_inbound_id() {
        let mut w = ResponseWriter::new();
        let mut req = Request::new(Method::GET, Uri::from_static("/"));
        req.headers_mut().insert(X_REQUEST_ID.clone(), HeaderValue::from_static("abc-123"));

        request_id().then(echo()).serve(&mut w, &mut req).await.unwrap();

        assert_eq!(w.body(), b"abc-123");
        assert_eq!(w.headers()[&X_REQUEST_ID], "abc-123");
    }

    #[tokio::test]
    async fn replaces_empty_or_oversized_inbound_id() {
        let longest = "x".repeat(MAX_INBOUND_LEN);
        let too_long = "x".repeat(MAX_INBOUND_LEN + 1);

        for inbound in ["", too_long.as_str()] {
            let mut w = ResponseWriter::new();
            let mut req = Request::new(Method::GET, Uri::from_static("/"));
            req.headers_mut().insert(X_REQUEST_ID.clone(), HeaderValue::from_str(inbound).unwrap());

            request_id().then(echo()).serve(&mut w, &mut req).await.unwrap();

            let id = std::str::from_utf8(w.body()).unwrap();
            assert!(Uuid::parse_str(id).is_ok(), "`{inbound}` should be replaced, got {id}");
            assert_eq!(w.headers()[&X_REQUEST_ID], id);
        }

        let mut w = ResponseWriter::new();
        let mut req = Request::new(Method::GET, Uri::from_static("/"));
        req.headers_mut().insert(X_REQUEST_ID.clone(), HeaderValue::from_str(&longest).unwrap());
        request_id().then(echo()).serve(&mut w, &mut req).await.unwrap();
        assert_eq!(w.body(), longest.as_bytes());
    }

    #[tokio::test]
    async fn generates_uuid_when_missing() {
        let mut w = ResponseWriter::new();
        let mut req = Request::new(Method::GET, Uri::from_static("/"));

        request_id().then(echo()).serve(&mut w, &mut req).await.unwrap();

        let id = std::str::from_utf8(w.body()).unwrap();
        assert!(Uuid::parse_str(id).is_ok(), "generated id should be a UUID, got {id}");
        assert_eq!(w.headers()[&X_REQUEST_ID], id);
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(RequestId::generate(), RequestId::generate());
    }
}
