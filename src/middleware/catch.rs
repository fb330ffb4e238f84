//! Failure interception.

use std::sync::Arc;

use super::Middleware;
use crate::error::BoxError;
use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::request::Request;
use crate::response::ResponseWriter;

/// Hands failures from the inner chain to `f`.
///
/// `f` may write a response and return `Ok(())` to mark the failure handled
/// (the mux's last-resort hook will not run), or return `Err` to keep it
/// propagating outward, either unchanged or translated. Successful outcomes
/// bypass `f`.
///
/// ```rust
/// use trymux::{middleware, StatusCode};
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("not found")]
/// struct NotFound;
///
/// let not_found_as_404 = middleware::catch(|w, _req, err| {
///     if err.is::<NotFound>() {
///         w.error(StatusCode::NOT_FOUND, "no such user");
///         return Ok(());
///     }
///     Err(err)
/// });
/// # let _ = not_found_as_404;
/// ```
pub fn catch<F>(f: F) -> Middleware
where
    F: Fn(&mut ResponseWriter, &Request, BoxError) -> Result<(), BoxError> + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Middleware::new(move |next| Arc::new(Catch { f: Arc::clone(&f), next }) as BoxedHandler)
}

struct Catch<F> {
    f: Arc<F>,
    next: BoxedHandler,
}

impl<F> Handler for Catch<F>
where
    F: Fn(&mut ResponseWriter, &Request, BoxError) -> Result<(), BoxError> + Send + Sync + 'static,
{
    fn serve<'a>(&'a self, w: &'a mut ResponseWriter, req: &'a mut Request) -> BoxFuture<'a> {
        Box::pin(async move {
            match self.next.serve(w, req).await {
                Ok(()) => Ok(()),
                Err(err) => (self.f)(w, &*req, err),
            }
        })
    }
}
