//! Unified error types.

use std::net::AddrParseError;

/// The failure value a [`Handler`](crate::Handler) returns.
///
/// Anything implementing `std::error::Error + Send + Sync` converts into it
/// with `?` or `.into()`. Last-resort hooks and `catch` middleware recover the
/// concrete type with `downcast_ref`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by trymux's fallible operations.
///
/// Application-level failures travel as [`BoxError`] values through the
/// middleware chain, not as `Error`s. This type surfaces infrastructure
/// failures: binding a port, accepting a connection, registering a route.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    InvalidAddr {
        addr: String,
        #[source]
        source: AddrParseError,
    },

    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("route pattern `{pattern}` conflicts with an existing route: {source}")]
    RouteConflict {
        pattern: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("route pattern `{0}` is already registered")]
    DuplicateRoute(String),
}
