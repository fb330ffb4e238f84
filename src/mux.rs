//! The dispatcher.
//!
//! [`Mux`] sits between the transport and the pattern router. It owns the
//! global middleware chain and the last-resort hook, resolves every route to
//! `global ∘ local ∘ handler` once at registration, and turns a failed outcome
//! into a response exactly once per request.
//!
//! # Request lifecycle
//!
//! ```text
//! RECEIVED ──► ROUTING ──┬─ no template matches ──────────► 404 (router)
//!                        ├─ template matches, method not ─► 405 + Allow (router)
//!                        └─ match ──► EXECUTING ──┬─ Ok(())  ─► COMPLETED, writer as-is
//!                                                 └─ Err(e)  ─► last-resort hook ─► COMPLETED
//! ```
//!
//! 404 and 405 never reach middleware, handlers or the hook.
//!
//! # Configuration phase
//!
//! Setters take `&mut self`; [`Server::serve`](crate::Server::serve) takes the
//! mux by value and shares it immutably. Configure everything first, then
//! serve. Set global middleware *before* registering the routes it should
//! protect: resolution is eager and already-registered routes keep the chain
//! they were resolved with.

use std::fmt;
use std::sync::Arc;

use http::header::ALLOW;
use http::{HeaderValue, StatusCode};
use tracing::{debug, error};

use crate::error::{BoxError, Error};
use crate::handler::{boxed, BoxedHandler, Handler};
use crate::middleware::{self, Middleware};
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::route::Route;
use crate::router::{Lookup, Pattern, Router};

/// The hook that turns a failure no middleware handled into a response.
pub type LastResortHandler = Arc<dyn Fn(&mut ResponseWriter, &Request, BoxError) + Send + Sync>;

const NOT_FOUND_BODY: &str = "404 page not found";
const METHOD_NOT_ALLOWED_BODY: &str = "Method Not Allowed";

/// Request dispatcher with fallible handlers, ordered middleware and a
/// centralized error hook.
///
/// ```rust
/// use trymux::{handler_fn, middleware, Mux, Route, StatusCode};
///
/// let mut mux = Mux::new();
/// mux.set_global_middleware([middleware::request_id(), middleware::trace()]);
/// mux.set_last_resort_handler(|w, _req, err| {
///     w.error(StatusCode::BAD_GATEWAY, &format!("upstream: {err}"));
/// });
///
/// mux.route(
///     Route::new("GET /users/{id}", handler_fn(|w, req| {
///         Box::pin(async move {
///             let id = req.param("id").unwrap_or_default().to_owned();
///             w.json(format!(r#"{{"id":"{id}"}}"#).into_bytes());
///             Ok(())
///         })
///     })),
///     [middleware::recover()],
/// );
/// ```
pub struct Mux {
    router: Router,
    global: Middleware,
    last_resort: Option<LastResortHandler>,
}

impl Mux {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            global: Middleware::identity(),
            last_resort: None,
        }
    }

    // ── Configuration ─────────────────────────────────────────────────────────

    /// Replaces the global chain, first entry outermost.
    ///
    /// An empty list leaves the current chain in place. Only routes registered
    /// afterwards are wrapped.
    pub fn set_global_middleware(
        &mut self,
        middleware: impl IntoIterator<Item = Middleware>,
    ) -> &mut Self {
        let chain: Vec<Middleware> = middleware.into_iter().collect();
        if chain.is_empty() {
            debug!("empty global middleware list ignored");
            return self;
        }

        debug!(layers = chain.len(), "global middleware set");
        self.global = middleware::fold(chain);
        self
    }

    /// Installs a custom last-resort hook. It replaces the built-in 500 answer
    /// entirely: whatever it writes is the response.
    pub fn set_last_resort_handler<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut ResponseWriter, &Request, BoxError) + Send + Sync + 'static,
    {
        self.last_resort = Some(Arc::new(hook));
        self
    }

    /// Restores the built-in last-resort hook.
    pub fn clear_last_resort_handler(&mut self) -> &mut Self {
        self.last_resort = None;
        self
    }

    // ── Registration ──────────────────────────────────────────────────────────

    /// Registers a [`Route`] with its route-specific middleware.
    ///
    /// # Panics
    ///
    /// Panics if the pattern is malformed, conflicts with an existing
    /// template, or repeats an existing method + path pair. Use
    /// [`try_route`](Self::try_route) to get the error instead.
    pub fn route(
        &mut self,
        route: Route,
        middleware: impl IntoIterator<Item = Middleware>,
    ) -> &mut Self {
        let (pattern, handler) = route.into_parts();
        self.insert(&pattern, handler, middleware)
            .unwrap_or_else(|e| panic!("{e}"));
        self
    }

    /// Registers `handler` under `pattern`, wrapped by `middleware` and then by
    /// the global chain.
    ///
    /// `pattern` is `"[METHOD ]/path"`, with `{name}` for one segment and
    /// `{name...}` for the rest of the path. Without a method the route
    /// answers every method; a `GET` route also answers `HEAD`.
    ///
    /// Matching is always exact. A template ending in `/` matches only that
    /// path, not the subtree below it, and `"/"` matches only the root; use
    /// `{name...}` to capture a subtree. A trailing `{$}` is accepted and
    /// changes nothing.
    ///
    /// # Panics
    ///
    /// Same conditions as [`route`](Self::route); see
    /// [`try_register`](Self::try_register).
    pub fn register(
        &mut self,
        pattern: &str,
        handler: impl Handler,
        middleware: impl IntoIterator<Item = Middleware>,
    ) -> &mut Self {
        self.insert(pattern, boxed(handler), middleware)
            .unwrap_or_else(|e| panic!("{e}"));
        self
    }

    pub fn try_route(
        &mut self,
        route: Route,
        middleware: impl IntoIterator<Item = Middleware>,
    ) -> Result<(), Error> {
        let (pattern, handler) = route.into_parts();
        self.insert(&pattern, handler, middleware)
    }

    pub fn try_register(
        &mut self,
        pattern: &str,
        handler: impl Handler,
        middleware: impl IntoIterator<Item = Middleware>,
    ) -> Result<(), Error> {
        self.insert(pattern, boxed(handler), middleware)
    }

    fn insert(
        &mut self,
        pattern: &str,
        handler: BoxedHandler,
        middleware: impl IntoIterator<Item = Middleware>,
    ) -> Result<(), Error> {
        let pattern = Pattern::parse(pattern)?;
        let local = middleware::fold(middleware);
        let resolved = self.global.then(local.then(handler));

        self.router.insert(&pattern, resolved)?;
        debug!(%pattern, "route registered");
        Ok(())
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Dispatches one request: route it, run the resolved chain, and hand a
    /// failure to the last-resort hook.
    pub async fn handle(&self, w: &mut ResponseWriter, req: &mut Request) {
        let handler = match self.router.lookup(req.method(), req.path()) {
            Lookup::Found { handler, params } => {
                req.set_params(params);
                handler
            }
            Lookup::NotFound => {
                w.error(StatusCode::NOT_FOUND, NOT_FOUND_BODY);
                return;
            }
            Lookup::MethodNotAllowed { allow } => {
                if let Ok(allow) = HeaderValue::from_str(&allow) {
                    w.headers_mut().insert(ALLOW, allow);
                }
                w.error(StatusCode::METHOD_NOT_ALLOWED, METHOD_NOT_ALLOWED_BODY);
                return;
            }
        };

        if let Err(err) = handler.serve(w, req).await {
            match &self.last_resort {
                Some(hook) => hook(w, req, err),
                None => default_last_resort(w, req, err),
            }
        }
    }
}

/// The built-in hook: `500` with the error's message as a plain-text body.
fn default_last_resort(w: &mut ResponseWriter, req: &Request, err: BoxError) {
    error!(method = %req.method(), path = %req.path(), error = %err, "unhandled handler failure");
    w.error(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string());
}

impl Default for Mux {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for Mux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mux")
            .field("custom_last_resort", &self.last_resort.is_some())
            .finish_non_exhaustive()
    }
}
