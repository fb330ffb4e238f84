//! Minimal trymux demo — fallible JSON endpoints, middleware and a custom
//! last-resort hook.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/users/42
//!   curl -i http://localhost:3000/users/7          # 404 via the hook
//!   curl -i -X POST http://localhost:3000/users     # 400 via the hook
//!   curl -i -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl -i -X DELETE http://localhost:3000/users/42 -H 'authorization: Bearer demo'
//!   curl -i http://localhost:3000/healthz

use tracing_subscriber::EnvFilter;
use trymux::{health, middleware, BoxError, BoxFuture, Middleware, Mux, Request, ResponseWriter, Server, StatusCode};

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("user {0} not found")]
    UserNotFound(String),
    #[error("request body is empty")]
    EmptyBody,
    #[error("missing or invalid bearer token")]
    Unauthorized,
}

#[tokio::main]
async fn main() -> Result<(), trymux::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let addr = std::env::var("TRYMUX_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_owned());

    let mut mux = Mux::new();
    // Global chain first: routes registered below are resolved against it.
    mux.set_global_middleware([middleware::trace(), middleware::request_id(), middleware::recover()]);
    mux.set_last_resort_handler(|w, _req, err| match err.downcast_ref::<ApiError>() {
        Some(ApiError::UserNotFound(_)) => w.error(StatusCode::NOT_FOUND, &err.to_string()),
        Some(ApiError::EmptyBody) => w.error(StatusCode::BAD_REQUEST, &err.to_string()),
        Some(ApiError::Unauthorized) => w.error(StatusCode::UNAUTHORIZED, &err.to_string()),
        None => w.error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error"),
    });

    mux.register("GET /users/{id}", trymux::handler_fn(get_user), [])
        .register("POST /users", trymux::handler_fn(create_user), [])
        .register("DELETE /users/{id}", trymux::handler_fn(delete_user), [require_bearer()])
        .register("GET /healthz", health::Liveness, [])
        .register("GET /readyz", health::Readiness, []);

    Server::bind(&addr)?.serve(mux).await
}

// GET /users/{id}
fn get_user<'a>(w: &'a mut ResponseWriter, req: &'a mut Request) -> BoxFuture<'a> {
    Box::pin(async move {
        let id = req.param("id").unwrap_or_default();
        if id != "42" {
            return Err(BoxError::from(ApiError::UserNotFound(id.to_owned())));
        }
        w.json(format!(r#"{{"id":"{id}","name":"alice"}}"#).into_bytes());
        Ok(())
    })
}

// POST /users
//
// req.body() is &[u8] — parse with serde_json::from_slice, simd-json, etc.
fn create_user<'a>(w: &'a mut ResponseWriter, req: &'a mut Request) -> BoxFuture<'a> {
    Box::pin(async move {
        if req.body().is_empty() {
            return Err(BoxError::from(ApiError::EmptyBody));
        }
        w.set_status(StatusCode::CREATED);
        w.header("location", "/users/99");
        w.json(br#"{"id":"99","name":"new_user"}"#.to_vec());
        Ok(())
    })
}

// DELETE /users/{id} → 204 No Content
fn delete_user<'a>(w: &'a mut ResponseWriter, _req: &'a mut Request) -> BoxFuture<'a> {
    Box::pin(async move {
        w.set_status(StatusCode::NO_CONTENT);
        Ok(())
    })
}

/// Route-level auth: fails with `Unauthorized` unless a bearer token is present.
fn require_bearer() -> Middleware {
    middleware::from_fn(|w, req, next| {
        Box::pin(async move {
            let authorized = req
                .header("authorization")
                .and_then(|v| v.strip_prefix("Bearer "))
                .is_some_and(|token| !token.is_empty());
            if !authorized {
                return Err(BoxError::from(ApiError::Unauthorized));
            }
            next.serve(w, req).await
        })
    })
}
