//! # trymux
//!
//! Fallible handlers, ordered middleware and one place where unhandled
//! failures become HTTP responses, in front of a radix-tree pattern router.
//!
//! ## The contract
//!
//! Handlers do not write error responses. They return `Err(e)` and move on.
//! Middleware wraps handlers and sees every outcome on the way out; it can
//! log a failure, translate it, or swallow it. Whatever is still a failure
//! after the outermost middleware reaches the mux's **last-resort hook**,
//! exactly once. By default that is `500` with the error's message as a
//! plain-text body; install your own hook to change it.
//!
//! What trymux leaves to others:
//!
//! - **Pattern matching** — a [`matchit`] radix tree, `"METHOD /path/{param}"`
//! - **Connections, HTTP/1.1 + HTTP/2, keep-alive** — hyper
//! - **Body parsing** — you get bytes
//! - **Log output** — events go through `tracing`; pick your subscriber
//!
//! ## Ordering
//!
//! ```text
//! resolved handler = global[0] ∘ … ∘ global[n] ∘ local[0] ∘ … ∘ local[m] ∘ handler
//! ```
//!
//! Global middleware always runs outside route middleware, first entry
//! outermost. Resolution happens at registration: set the global chain before
//! registering routes.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use trymux::{handler_fn, middleware, BoxError, Mux, Route, Server, StatusCode};
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("user {0} not found")]
//! struct UserNotFound(String);
//!
//! #[tokio::main]
//! async fn main() -> Result<(), trymux::Error> {
//!     let mut mux = Mux::new();
//!     mux.set_global_middleware([middleware::trace(), middleware::recover()]);
//!     mux.set_last_resort_handler(|w, _req, err| {
//!         if err.is::<UserNotFound>() {
//!             w.error(StatusCode::NOT_FOUND, &err.to_string());
//!         } else {
//!             w.error(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
//!         }
//!     });
//!
//!     mux.route(
//!         Route::new("GET /users/{id}", handler_fn(|w, req| {
//!             Box::pin(async move {
//!                 let id = req.param("id").unwrap_or_default();
//!                 if id != "42" {
//!                     return Err(BoxError::from(UserNotFound(id.to_owned())));
//!                 }
//!                 w.json(br#"{"id":"42","name":"alice"}"#.to_vec());
//!                 Ok(())
//!             })
//!         })),
//!         [],
//!     );
//!
//!     Server::bind("0.0.0.0:3000")?.serve(mux).await
//! }
//! ```

mod error;
mod handler;
mod mux;
mod request;
mod response;
mod route;
mod router;
mod server;

pub mod health;
pub mod middleware;

pub use error::{BoxError, Error};
pub use handler::{boxed, handler_fn, BoxFuture, BoxedHandler, Handler, HandlerFn, Outcome};
pub use middleware::Middleware;
pub use mux::{LastResortHandler, Mux};
pub use request::Request;
pub use response::ResponseWriter;
pub use route::Route;
pub use server::Server;

pub use http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
