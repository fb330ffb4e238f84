//! HTTP server and graceful shutdown.
//!
//! The server is the transport in front of the [`Mux`]: hyper owns
//! connections, HTTP/1.1 vs HTTP/2 negotiation and keep-alive; this module
//! collects each request body, hands a fresh [`ResponseWriter`] and the
//! [`Request`] to [`Mux::handle`], and sends back whatever the writer holds.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Immediately stopping `listener.accept()`, so no new connections are made.
//! 2. Telling every open connection to shut down: idle keep-alive connections
//!    close at once, requests already in flight finish first.
//! 3. Returning from [`Server::serve`], which lets `main` exit cleanly.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::mux::Mux;
use crate::request::Request;
use crate::response::ResponseWriter;

enum Bind {
    Addr(SocketAddr),
    Listener(TcpListener),
}

/// The HTTP server.
pub struct Server {
    bind: Bind,
}

impl Server {
    /// Configures the server to bind to `addr` when it starts serving.
    ///
    /// ```rust
    /// use trymux::Server;
    /// let server = Server::bind("0.0.0.0:3000").unwrap();
    /// # let _ = server;
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let parsed = addr.parse::<SocketAddr>().map_err(|source| Error::InvalidAddr {
            addr: addr.to_owned(),
            source,
        })?;
        Ok(Self { bind: Bind::Addr(parsed) })
    }

    /// Serves on an already bound listener (e.g. port `0` in tests).
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { bind: Bind::Listener(listener) }
    }

    /// Starts accepting connections and dispatching them through `mux`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, mux: Mux) -> Result<(), Error> {
        self.serve_with_shutdown(mux, shutdown_signal()).await
    }

    /// Like [`serve`](Self::serve), but stops accepting when `signal` resolves.
    pub async fn serve_with_shutdown(
        self,
        mux: Mux,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = match self.bind {
            Bind::Addr(addr) => TcpListener::bind(addr).await?,
            Bind::Listener(listener) => listener,
        };

        // From here on the mux is shared read-only across connection tasks.
        let mux = Arc::new(mux);

        info!(addr = %listener.local_addr()?, "trymux listening");

        let builder = ConnBuilder::new(TokioExecutor::new());
        let graceful = GracefulShutdown::new();
        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a SIGTERM stops accepting even if
                // more connections are queued.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let mux = Arc::clone(&mux);
                    let io = TokioIo::new(stream);

                    // Called once per request on the connection.
                    let svc = service_fn(move |req| {
                        let mux = Arc::clone(&mux);
                        async move { dispatch(mux, req, remote_addr).await }
                    });

                    let conn = builder.serve_connection_with_upgrades(io, svc).into_owned();
                    let conn = graceful.watch(conn);

                    tasks.spawn(async move {
                        if let Err(e) = conn.await {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // Idle keep-alive connections close here instead of holding the
        // server open until the client hangs up.
        drop(listener);
        graceful.shutdown().await;
        while tasks.join_next().await.is_some() {}

        info!("trymux stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Hot path: one hyper request in, one response out.
///
/// Every failure is answered with a status code, so hyper never sees an error.
async fn dispatch(
    mux: Arc<Mux>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            let mut w = ResponseWriter::new();
            w.error(StatusCode::BAD_REQUEST, "failed to read request body");
            return Ok(w.into_response());
        }
    };

    let mut req = Request::from_parts(parts, body);
    let mut w = ResponseWriter::new();
    mux.handle(&mut w, &mut req).await;

    debug!(peer = %remote_addr, status = w.status().as_u16(), "response ready");
    Ok(w.into_response())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On Windows only Ctrl-C is available. If a handler cannot be installed the
/// failure is logged and that signal is ignored.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
