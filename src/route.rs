//! Route descriptor.

use std::fmt;

use crate::handler::{boxed, BoxedHandler, Handler};

/// A pattern bound to a handler, handed to [`Mux::route`](crate::Mux::route).
///
/// Lets route tables be declared apart from the mux they end up on:
///
/// ```rust
/// use trymux::{handler_fn, Route};
///
/// fn routes() -> Vec<Route> {
///     vec![
///         Route::new("GET /healthz", trymux::health::Liveness),
///         Route::new("DELETE /users/{id}", handler_fn(|_w, _req| Box::pin(async move { Ok(()) }))),
///     ]
/// }
/// # let _ = routes();
/// ```
#[derive(Clone)]
pub struct Route {
    pattern: String,
    handler: BoxedHandler,
}

impl Route {
    pub fn new(pattern: impl Into<String>, handler: impl Handler) -> Self {
        Self { pattern: pattern.into(), handler: boxed(handler) }
    }

    pub fn pattern(&self) -> &str { &self.pattern }
    pub fn handler(&self) -> &BoxedHandler { &self.handler }

    pub(crate) fn into_parts(self) -> (String, BoxedHandler) {
        (self.pattern, self.handler)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route").field("pattern", &self.pattern).finish_non_exhaustive()
    }
}
