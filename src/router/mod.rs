//! Callback-style middleware router.
//!
//! Layers run in registration order. Each one is a callback receiving
//! `(req, res, next)` and decides whether the chain continues by calling
//! [`Next`]. Error callbacks `(err, req, res, next)` are skipped until a layer
//! fails, after which plain callbacks are skipped until an error callback
//! clears the error with `next.call()`.
//!
//! As in Express, `GET` routes also answer `HEAD` requests and route
//! parameters are percent-decoded before handlers see them.
//!
//! ```rust,no_run
//! use coroute::{Layer, Method, Router};
//!
//! let app = Router::new();
//! app.on(Method::Get, "/users/:id", Layer::callback(|req, res, _next| {
//!     res.send(format!("user {}", req.param("id").unwrap_or("?")));
//! }));
//! ```

mod layer;
mod route;

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use http::StatusCode;
use http_body_util::Full;
use parking_lot::RwLock;
use tracing::{debug, error};

use crate::error::Error;
use crate::method::Method;
use crate::next::Next;
use crate::request::Request;
use crate::response::{HttpResponse, Response};

pub use layer::{Callback, ErrorCallback, Layer, ParamCallback};
pub use route::Route;

use layer::{Entry, Matched, Matcher};

/// The application router.
///
/// A cheap handle: clones share one layer stack, so a router can be mounted
/// with [`Router::mount`] before its own routes are registered.
#[derive(Clone, Default)]
pub struct Router {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    layers: RwLock<Vec<Arc<Entry>>>,
    params: RwLock<HashMap<String, Vec<ParamCallback>>>,
}

/// How a layer (or a whole router) left the chain.
pub(crate) enum Flow {
    /// Continue with the next layer, carrying the pending error if any.
    Next(Option<Error>),
    /// Every `Next` was dropped unused: the chain stops here.
    Done,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `layer` for `method` + `path`. Path parameters use `:name`
    /// (or matchit's `{name}`) syntax.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route pattern.
    pub fn on(&self, method: Method, path: &str, layer: impl Into<Layer>) -> &Self {
        self.push(Matcher::route(Some(method), path), layer.into())
    }

    /// Registers `layer` for every method on `path`.
    pub fn all(&self, path: &str, layer: impl Into<Layer>) -> &Self {
        self.push(Matcher::route(None, path), layer.into())
    }

    /// Registers `layer` for every request whose path starts with `path`.
    pub fn mount(&self, path: &str, layer: impl Into<Layer>) -> &Self {
        self.push(Matcher::prefix(path), layer.into())
    }

    /// Registers a callback run before the first route capturing `name`.
    /// It runs once per distinct value per request.
    pub fn param(&self, name: &str, callback: ParamCallback) -> &Self {
        self.inner.params.write().entry(name.to_owned()).or_default().push(callback);
        self
    }

    /// Returns a builder registering several methods on one path.
    pub fn route(&self, path: &str) -> Route {
        Route::new(self.clone(), path)
    }

    fn push(&self, matcher: Matcher, layer: Layer) -> &Self {
        debug!(kind = layer.kind(), "registering layer");
        self.inner.layers.write().push(Arc::new(Entry { matcher, layer }));
        self
    }

    fn entry(&self, idx: usize) -> Option<Arc<Entry>> {
        self.inner.layers.read().get(idx).cloned()
    }

    /// Runs one request through the stack and returns the response.
    ///
    /// The chain runs on its own task: the response is returned as soon as a
    /// handler sends it, while the remaining layers may still be running.
    pub async fn dispatch(&self, req: http::Request<Bytes>) -> http::Response<Full<Bytes>> {
        let (parts, body) = req.into_parts();
        let Ok(method) = Method::try_from(&parts.method) else {
            return plain(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        };
        let request = Request::new(method, parts.uri, parts.headers, body);
        let (response, sent) = Response::channel();

        let router = self.clone();
        tokio::spawn(async move {
            let outcome = router.handle(request.clone(), response.clone(), None).await;
            if response.is_finished() {
                return;
            }
            match outcome {
                Flow::Next(Some(err)) => {
                    error!(method = %method, path = request.path(), error = %err, "unhandled error");
                    response
                        .status(err.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
                        .send(err.message().to_owned());
                }
                Flow::Next(None) => {
                    response
                        .status(StatusCode::NOT_FOUND)
                        .send(format!("Cannot {method} {}", request.path()));
                }
                // A handler that dropped `next` still owns the response.
                Flow::Done => {}
            }
        });

        match sent.await {
            Ok(response) => response,
            Err(_) => {
                error!("response dropped without being sent");
                plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }

    pub(crate) fn handle(&self, req: Request, res: Response, err: Option<Error>) -> BoxFuture<'static, Flow> {
        let router = self.clone();
        Box::pin(async move { router.run(req, res, err).await })
    }

    async fn run(&self, req: Request, res: Response, mut err: Option<Error>) -> Flow {
        // Parameter values whose callbacks already ran for this request.
        let mut resolved = HashMap::new();
        let mut idx = 0;

        while let Some(entry) = self.entry(idx) {
            idx += 1;
            let Some(matched) = entry.matcher.matches(req.method(), req.path()) else {
                continue;
            };

            let flow = match (&entry.layer, err.take()) {
                (Layer::Callback(callback), None) => {
                    match self.run_params(&req, &res, &matched, &mut resolved).await {
                        Flow::Next(None) => {}
                        Flow::Next(Some(e)) => {
                            err = Some(e);
                            continue;
                        }
                        Flow::Done => return Flow::Done,
                    }
                    let req = matched.view(&req);
                    invoke(|next| callback(req, res.clone(), next)).await
                }
                (Layer::ErrorCallback(callback), Some(e)) => {
                    let req = matched.view(&req);
                    invoke(|next| callback(e, req, res.clone(), next)).await
                }
                (Layer::Router(router), pending) => {
                    router.handle(matched.view(&req), res.clone(), pending).await
                }
                (_, pending) => {
                    err = pending;
                    continue;
                }
            };

            match flow {
                Flow::Next(e) => err = e,
                Flow::Done => return Flow::Done,
            }
        }

        Flow::Next(err)
    }

    async fn run_params(
        &self,
        req: &Request,
        res: &Response,
        matched: &Matched,
        resolved: &mut HashMap<String, String>,
    ) -> Flow {
        for (name, value) in &matched.params {
            if resolved.get(name) == Some(value) {
                continue;
            }
            let callbacks = self.inner.params.read().get(name).cloned().unwrap_or_default();
            let req = req.with_params(matched.param_map());
            for callback in callbacks {
                let flow = invoke(|next| callback(req.clone(), res.clone(), next, value.clone())).await;
                if !matches!(flow, Flow::Next(None)) {
                    return flow;
                }
            }
            resolved.insert(name.clone(), value.clone());
        }
        Flow::Next(None)
    }
}

/// Calls one callback and waits for its verdict. A panic counts as
/// `next.fail(panic)`.
async fn invoke(call: impl FnOnce(Next)) -> Flow {
    let (next, signal) = Next::channel();
    if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| call(next))) {
        return Flow::Next(Some(Error::from_panic(panic)));
    }
    match signal.await {
        Ok(outcome) => Flow::Next(outcome),
        Err(_) => Flow::Done,
    }
}

fn plain(status: StatusCode, body: &'static str) -> HttpResponse {
    let mut response = http::Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use http_body_util::BodyExt;

    use super::*;

    async fn get(router: &Router, uri: &str) -> (StatusCode, String) {
        let req = http::Request::get(uri).body(Bytes::new()).unwrap();
        let res = router.dispatch(req).await;
        let status = res.status();
        let body = res.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn layers_run_in_registration_order() {
        let app = Router::new();
        app.mount("/", Layer::callback(|req, _res, next| {
            req.set_local(String::from("first"));
            next.call();
        }));
        app.on(Method::Get, "/", Layer::callback(|req, res, _next| {
            res.send(req.local::<String>().unwrap_or_default());
        }));

        assert_eq!(get(&app, "/").await, (StatusCode::OK, "first".to_owned()));
    }

    #[tokio::test]
    async fn errors_skip_to_the_next_error_callback() {
        let skipped = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&skipped);

        let app = Router::new();
        app.on(Method::Get, "/", Layer::callback(|_req, _res, next| next.fail(Error::new("nope"))));
        app.on(Method::Get, "/", Layer::callback(move |_req, _res, _next| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        app.mount("/", Layer::error_callback(|err, _req, res, _next| {
            res.status(StatusCode::BAD_GATEWAY).send(err.message().to_owned());
        }));

        assert_eq!(get(&app, "/").await, (StatusCode::BAD_GATEWAY, "nope".to_owned()));
        assert_eq!(skipped.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn panics_are_forwarded_as_errors() {
        let app = Router::new();
        app.on(Method::Get, "/", Layer::callback(|_req, _res, _next| panic!("kaboom")));

        assert_eq!(get(&app, "/").await, (StatusCode::INTERNAL_SERVER_ERROR, "kaboom".to_owned()));
    }

    #[tokio::test]
    async fn unmatched_requests_are_not_found() {
        let app = Router::new();
        assert_eq!(get(&app, "/missing").await, (StatusCode::NOT_FOUND, "Cannot GET /missing".to_owned()));
    }

    #[tokio::test]
    async fn mounted_routers_see_relative_paths_and_late_routes() {
        let app = Router::new();
        let api = Router::new();
        app.mount("/api", api.clone());
        api.on(Method::Get, "/users/:id", Layer::callback(|req, res, _next| {
            res.send(format!("{} {}", req.path(), req.param("id").unwrap_or_default()));
        }));

        assert_eq!(get(&app, "/api/users/7").await, (StatusCode::OK, "/users/7 7".to_owned()));
    }

    #[tokio::test]
    async fn param_callbacks_run_once_per_value() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let app = Router::new();
        app.param("id", Arc::new(move |req: Request, _res: Response, next: Next, id: String| {
            counter.fetch_add(1, Ordering::SeqCst);
            req.set_local(id);
            next.call();
        }));
        app.on(Method::Get, "/:id", Layer::callback(|_req, _res, next| next.call()));
        app.on(Method::Get, "/:id", Layer::callback(|req, res, _next| {
            res.send(req.local::<String>().unwrap_or_default());
        }));

        assert_eq!(get(&app, "/42").await, (StatusCode::OK, "42".to_owned()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_methods_are_rejected() {
        let app = Router::new();
        let req = http::Request::builder()
            .method(http::Method::from_bytes(b"BREW").unwrap())
            .uri("/")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(app.dispatch(req).await.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
