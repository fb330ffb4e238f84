//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::{Extensions, HeaderMap, Method, Uri};

/// An incoming HTTP request with its body already collected.
///
/// Handlers receive it by mutable borrow so middleware can attach values
/// (a request id, an authenticated principal) through [`extensions_mut`](Self::extensions_mut).
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    params: HashMap<String, String>,
    extensions: Extensions,
}

impl Request {
    /// A request with no headers and an empty body.
    ///
    /// ```rust
    /// use trymux::{Method, Request, Uri};
    ///
    /// let req = Request::new(Method::GET, Uri::from_static("/users/42?full=1"));
    /// assert_eq!(req.path(), "/users/42");
    /// ```
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: HashMap::new(),
            extensions: Extensions::new(),
        }
    }

    /// Builds a request from the parts hyper hands over and the collected body.
    pub fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            params: HashMap::new(),
            extensions: parts.extensions,
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn query(&self) -> Option<&str> { self.uri.query() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }

    /// Case-insensitive header lookup. Values that are not visible ASCII read as `None`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `GET /users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> { &self.params }

    pub(crate) fn set_params(&mut self, params: impl IntoIterator<Item = (String, String)>) {
        self.params = params.into_iter().collect();
    }
}
