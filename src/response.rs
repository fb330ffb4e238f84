//! The response sink handed to every handler.
//!
//! A [`ResponseWriter`] buffers status, headers and body for one request.
//! Middleware and handlers write to the same writer in call order; the
//! transport turns it into an `http::Response` once the chain returns.

use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderMap, HeaderValue, StatusCode};
use http_body_util::Full;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// A buffered HTTP response under construction.
///
/// Starts as `200 OK` with no headers and an empty body, like a freshly
/// accepted request that nothing has answered yet. It doubles as the
/// recorder in tests: dispatch a request, then inspect the writer.
///
/// ```rust
/// use trymux::{ResponseWriter, StatusCode};
///
/// let mut w = ResponseWriter::new();
/// w.set_status(StatusCode::CREATED);
/// w.header("location", "/users/42");
/// w.json(br#"{"id":42}"#.to_vec());
///
/// assert_eq!(w.status(), StatusCode::CREATED);
/// assert_eq!(w.body(), br#"{"id":42}"#);
/// ```
#[derive(Debug)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new(), body: BytesMut::new() }
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Appends a header. Values that are not valid header text are dropped
    /// with a warning; use [`headers_mut`](Self::headers_mut) for typed access.
    pub fn header(&mut self, name: &'static str, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.append(name, value);
            }
            Err(_) => tracing::warn!(header = name, "dropping invalid header value"),
        }
    }

    /// Appends raw bytes to the body.
    pub fn write(&mut self, chunk: impl AsRef<[u8]>) {
        self.body.extend_from_slice(chunk.as_ref());
    }

    /// Sets `content-type: text/plain; charset=utf-8` and appends `body`.
    pub fn text(&mut self, body: impl Into<String>) {
        let body: String = body.into();
        self.content_type(TEXT_PLAIN);
        self.write(body);
    }

    /// Sets `content-type: application/json` and appends `body`.
    ///
    /// Pass bytes from your serialiser directly: `serde_json::to_vec(&val)?`.
    pub fn json(&mut self, body: Vec<u8>) {
        self.content_type(APPLICATION_JSON);
        self.write(body);
    }

    /// Replaces the response with a plain-text error.
    ///
    /// Sets `status`, `content-type: text/plain; charset=utf-8` and
    /// `x-content-type-options: nosniff`, drops any `content-length`, and
    /// replaces the body with exactly `message`. Headers other middleware set
    /// earlier are kept.
    pub fn error(&mut self, status: StatusCode, message: &str) {
        self.headers.remove(CONTENT_LENGTH);
        self.content_type(TEXT_PLAIN);
        self.headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        self.status = status;
        self.body.clear();
        self.body.extend_from_slice(message.as_bytes());
    }

    /// Converts the buffered response into the form hyper sends.
    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let mut response = http::Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }

    fn content_type(&mut self, value: &'static str) {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(value));
    }
}

impl Default for ResponseWriter {
    fn default() -> Self { Self::new() }
}
