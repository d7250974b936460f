//! Chained per-path registration.

use crate::method::Method;
use crate::router::{Layer, Router};

/// Registers several methods on one path:
///
/// ```rust,no_run
/// # use coroute::{Layer, Method, Router};
/// let app = Router::new();
/// app.route("/users/:id")
///     .on(Method::Get, Layer::callback(|_req, res, _next| res.send("read")))
///     .on(Method::Delete, Layer::callback(|_req, res, _next| res.send("gone")));
/// ```
#[derive(Clone)]
pub struct Route {
    router: Router,
    path: String,
}

impl Route {
    pub(crate) fn new(router: Router, path: &str) -> Self {
        Self { router, path: path.to_owned() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn on(&self, method: Method, layer: impl Into<Layer>) -> &Self {
        self.router.on(method, &self.path, layer);
        self
    }

    pub fn all(&self, layer: impl Into<Layer>) -> &Self {
        self.router.all(&self.path, layer);
        self
    }
}
