//! Built-in Kubernetes health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Register them on your mux, outside any auth middleware:
//!
//! ```rust
//! use trymux::{health, Mux};
//!
//! let mut mux = Mux::new();
//! mux.register("GET /healthz", health::Liveness, []);
//! mux.register("GET /readyz", health::Readiness, []);
//! ```
//!
//! Replace `Readiness` with your own handler if you need to gate on
//! dependency availability; return an error to fail the probe through the
//! last-resort hook.

use crate::handler::{BoxFuture, Handler};
use crate::request::Request;
use crate::response::ResponseWriter;

/// Liveness probe. Always `200 OK` with body `"ok"`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Liveness;

/// Readiness probe (default implementation). Always `200 OK` with body `"ready"`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Readiness;

impl Handler for Liveness {
    fn serve<'a>(&'a self, w: &'a mut ResponseWriter, _req: &'a mut Request) -> BoxFuture<'a> {
        Box::pin(async move {
            w.text("ok");
            Ok(())
        })
    }
}

impl Handler for Readiness {
    fn serve<'a>(&'a self, w: &'a mut ResponseWriter, _req: &'a mut Request) -> BoxFuture<'a> {
        Box::pin(async move {
            w.text("ready");
            Ok(())
        })
    }
}
