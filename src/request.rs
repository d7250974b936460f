//! Incoming HTTP request handle.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::{Extensions, HeaderMap, Uri};
use parking_lot::Mutex;

use crate::method::Method;

/// An incoming HTTP request.
///
/// Cloning is cheap: every handler of a request receives a clone sharing the
/// same head, body and locals. Only the path (relative to the router the
/// handler is mounted on) and the route parameters differ between layers.
#[derive(Clone)]
pub struct Request {
    shared: Arc<Shared>,
    path: Arc<str>,
    params: Arc<HashMap<String, String>>,
}

struct Shared {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    locals: Mutex<Extensions>,
}

impl Request {
    pub(crate) fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        let path = Arc::from(uri.path());
        Self {
            shared: Arc::new(Shared { method, uri, headers, body, locals: Mutex::default() }),
            path,
            params: Arc::default(),
        }
    }

    pub(crate) fn with_params(&self, params: HashMap<String, String>) -> Self {
        Self { shared: Arc::clone(&self.shared), path: Arc::clone(&self.path), params: Arc::new(params) }
    }

    pub(crate) fn with_path(&self, path: &str) -> Self {
        Self { shared: Arc::clone(&self.shared), path: Arc::from(path), params: Arc::default() }
    }

    pub fn method(&self) -> Method { self.shared.method }
    pub fn uri(&self) -> &Uri { &self.shared.uri }
    pub fn headers(&self) -> &HeaderMap { &self.shared.headers }
    pub fn body(&self) -> &Bytes { &self.shared.body }

    /// Path relative to the router currently handling the request.
    ///
    /// A router mounted with `use_at("/api", ..)` sees `/users` for
    /// `/api/users`; [`original_path`](Self::original_path) keeps the full one.
    pub fn path(&self) -> &str { &self.path }
    pub fn original_path(&self) -> &str { self.shared.uri.path() }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.shared.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter of the route being invoked.
    ///
    /// For a route `/users/:id`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> { &self.params }

    /// Stores a value visible to every later handler of this request.
    pub fn set_local<T: Clone + Send + Sync + 'static>(&self, value: T) {
        self.shared.locals.lock().insert(value);
    }

    pub fn local<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.shared.locals.lock().get::<T>().cloned()
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.shared.method)
            .field("uri", &self.shared.uri)
            .field("path", &self.path)
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str) -> Request {
        Request::new(Method::Get, uri.parse().unwrap(), HeaderMap::new(), Bytes::new())
    }

    #[test]
    fn mounted_views_share_locals_but_not_params() {
        let req = request("/api/users/42?full=1");
        assert_eq!(req.path(), "/api/users/42");

        let routed = req.with_params(HashMap::from([("id".to_owned(), "42".to_owned())]));
        assert_eq!(routed.param("id"), Some("42"));

        let mounted = routed.with_path("/users/42");
        assert_eq!(mounted.path(), "/users/42");
        assert_eq!(mounted.original_path(), "/api/users/42");
        assert_eq!(mounted.param("id"), None);

        mounted.set_local(7_u32);
        assert_eq!(req.local::<u32>(), Some(7));
    }
}
