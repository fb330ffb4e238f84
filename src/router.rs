//! Radix-tree pattern router.
//!
//! One tree per HTTP method, one more for method-less patterns.
//! O(path-length) lookup. The router knows nothing about middleware or
//! failures: it maps `(method, path)` to a terminal handler, or says why it
//! could not.

use std::collections::{HashMap, HashSet};
use std::fmt;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::error::Error;
use crate::handler::BoxedHandler;

// ── Pattern ───────────────────────────────────────────────────────────────────

/// A parsed `"[METHOD ]/path/{param}"` route pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Pattern {
    method: Option<Method>,
    path: String,
}

impl Pattern {
    /// Parses a pattern string.
    ///
    /// - `"GET /users/{id}"` matches `GET` (and `HEAD`) on `/users/<one segment>`
    /// - `"/users"` matches every method
    /// - `"/files/{path...}"` (or `{*path}`) captures the rest of the path
    /// - a trailing `{$}` is accepted and ignored; matching is always exact
    pub(crate) fn parse(pattern: &str) -> Result<Self, Error> {
        let invalid = |reason: &str| Error::InvalidPattern {
            pattern: pattern.to_owned(),
            reason: reason.to_owned(),
        };

        let trimmed = pattern.trim();
        let (method, path) = match trimmed.split_once(char::is_whitespace) {
            Some((method, rest)) if !method.starts_with('/') => {
                let method = Method::from_bytes(method.as_bytes())
                    .map_err(|_| invalid("invalid method"))?;
                (Some(method), rest.trim_start())
            }
            _ => (None, trimmed),
        };

        if !path.starts_with('/') {
            return Err(invalid("path must start with `/`"));
        }
        if path.contains(char::is_whitespace) {
            return Err(invalid("path must not contain whitespace"));
        }

        let path = path.strip_suffix("{$}").unwrap_or(path);
        if path.contains("{$}") {
            return Err(invalid("`{$}` is only allowed at the end"));
        }

        Ok(Self { method, path: rest_wildcards(path) })
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method {
            Some(method) => write!(f, "{method} {}", self.path),
            None => f.write_str(&self.path),
        }
    }
}

/// Rewrites `{name...}` segments into matchit's `{*name}` catch-all syntax.
fn rest_wildcards(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            match segment.strip_prefix('{').and_then(|s| s.strip_suffix("...}")) {
                Some(name) => format!("{{*{name}}}"),
                None => segment.to_owned(),
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Outcome of a router lookup.
pub(crate) enum Lookup<'r> {
    Found {
        handler: &'r BoxedHandler,
        params: Vec<(String, String)>,
    },
    MethodNotAllowed { allow: String },
    NotFound,
}

/// The pattern router.
///
/// One radix tree per HTTP method plus one for method-less patterns, so a
/// template registered for one method never shadows another method's routes.
/// Build it once at startup. Lookups never allocate beyond the captured params.
#[derive(Default)]
pub(crate) struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    any: MatchitRouter<BoxedHandler>,
    registered: HashSet<(Option<Method>, String)>,
}

impl Router {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` as the terminal callback for `pattern`.
    pub(crate) fn insert(&mut self, pattern: &Pattern, handler: BoxedHandler) -> Result<(), Error> {
        let key = (pattern.method.clone(), pattern.path.clone());
        if self.registered.contains(&key) {
            return Err(Error::DuplicateRoute(pattern.to_string()));
        }

        let tree = match &pattern.method {
            Some(method) => self.routes.entry(method.clone()).or_default(),
            None => &mut self.any,
        };
        tree.insert(pattern.path.clone(), handler)
            .map_err(|source| Error::RouteConflict { pattern: pattern.to_string(), source })?;

        self.registered.insert(key);
        Ok(())
    }

    /// Resolves `(method, path)`: the method's own tree, then `GET` for a
    /// `HEAD` request, then the method-less tree.
    pub(crate) fn lookup(&self, method: &Method, path: &str) -> Lookup<'_> {
        let head_as_get = (*method == Method::HEAD).then_some(&Method::GET);
        let matched = [Some(method), head_as_get]
            .into_iter()
            .flatten()
            .filter_map(|m| self.routes.get(m))
            .chain([&self.any])
            .find_map(|tree| tree.at(path).ok());

        if let Some(matched) = matched {
            return Lookup::Found {
                handler: matched.value,
                params: matched.params.iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect(),
            };
        }

        match self.allow(path) {
            Some(allow) => Lookup::MethodNotAllowed { allow },
            None => Lookup::NotFound,
        }
    }

    /// The `Allow` header value for a 405 answer, if any method matches `path`.
    fn allow(&self, path: &str) -> Option<String> {
        let mut allowed: Vec<&str> = self.routes.iter()
            .filter(|(_, tree)| tree.at(path).is_ok())
            .map(|(method, _)| method.as_str())
            .collect();
        if allowed.is_empty() {
            return None;
        }
        if allowed.contains(&"GET") && !allowed.contains(&"HEAD") {
            allowed.push("HEAD");
        }
        allowed.sort_unstable();
        Some(allowed.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{boxed, handler_fn};

    fn noop() -> BoxedHandler {
        boxed(handler_fn(|_w, _req| Box::pin(async move { Ok(()) })))
    }

    fn router(patterns: &[&str]) -> Router {
        let mut router = Router::new();
        for pattern in patterns {
            router.insert(&Pattern::parse(pattern).unwrap(), noop()).unwrap();
        }
        router
    }

    #[test]
    fn parses_method_and_path() {
        let pattern = Pattern::parse("POST   /data").unwrap();
        assert_eq!(pattern.method, Some(Method::POST));
        assert_eq!(pattern.path, "/data");

        let any = Pattern::parse("/data/{id}").unwrap();
        assert_eq!(any.method, None);
        assert_eq!(any.to_string(), "/data/{id}");
    }

    #[test]
    fn rewrites_rest_wildcards_and_exact_marker() {
        assert_eq!(Pattern::parse("GET /files/{path...}").unwrap().path, "/files/{*path}");
        assert_eq!(Pattern::parse("GET /{$}").unwrap().path, "/");
    }

    #[test]
    fn rejects_malformed_patterns() {
        for bad in ["", "GET", "GET data", "G(T /data", "/a/{$}/b", "GET /a b"] {
            assert!(
                matches!(Pattern::parse(bad), Err(Error::InvalidPattern { .. })),
                "`{bad}` should be rejected"
            );
        }
    }

    #[test]
    fn duplicate_method_and_path_is_an_error() {
        let mut router = router(&["GET /data"]);
        let err = router.insert(&Pattern::parse("GET /data").unwrap(), noop()).unwrap_err();
        assert!(matches!(err, Error::DuplicateRoute(p) if p == "GET /data"));

        // another method on the same template is fine
        router.insert(&Pattern::parse("POST /data").unwrap(), noop()).unwrap();
    }

    #[test]
    fn conflicting_templates_are_an_error() {
        let mut router = router(&["GET /data/{id}"]);
        let err = router.insert(&Pattern::parse("GET /data/{name}").unwrap(), noop()).unwrap_err();
        assert!(matches!(err, Error::RouteConflict { .. }));
    }

    #[test]
    fn classifies_lookups() {
        let router = router(&["GET /data/{id}", "POST /data/{id}", "/any"]);

        match router.lookup(&Method::GET, "/data/123") {
            Lookup::Found { params, .. } => assert_eq!(params, vec![("id".to_owned(), "123".to_owned())]),
            _ => panic!("expected a match"),
        }
        assert!(matches!(router.lookup(&Method::HEAD, "/data/1"), Lookup::Found { .. }));
        assert!(matches!(router.lookup(&Method::PATCH, "/any"), Lookup::Found { .. }));
        assert!(matches!(router.lookup(&Method::GET, "/data"), Lookup::NotFound));

        match router.lookup(&Method::DELETE, "/data/1") {
            Lookup::MethodNotAllowed { allow } => assert_eq!(allow, "GET, HEAD, POST"),
            _ => panic!("expected 405"),
        }
    }

    #[test]
    fn static_template_does_not_shadow_other_methods() {
        let router = router(&["GET /data/{id}", "POST /data/special", "/files/{path...}"]);

        match router.lookup(&Method::GET, "/data/special") {
            Lookup::Found { params, .. } => assert_eq!(params, vec![("id".to_owned(), "special".to_owned())]),
            _ => panic!("GET /data/{{id}} should answer /data/special"),
        }
        assert!(matches!(router.lookup(&Method::POST, "/data/special"), Lookup::Found { params, .. } if params.is_empty()));

        // the method-less tree answers after the method trees miss
        assert!(matches!(router.lookup(&Method::PUT, "/files/a/b"), Lookup::Found { .. }));

        match router.lookup(&Method::PUT, "/data/special") {
            Lookup::MethodNotAllowed { allow } => assert_eq!(allow, "GET, HEAD, POST"),
            _ => panic!("expected 405"),
        }
        match router.lookup(&Method::PUT, "/data/7") {
            Lookup::MethodNotAllowed { allow } => assert_eq!(allow, "GET, HEAD"),
            _ => panic!("expected 405"),
        }
    }
}
