//! The registration contract the adapter decorates.
//!
//! [`Framework`] is a constructor of application and sub-router instances;
//! [`Registrar`] is the callback-style registration API of such an instance.
//! [`Native`] implements both on top of [`Router`].

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use http::StatusCode;
use tracing::debug;

use crate::method::Method;
use crate::next::Next;
use crate::request::Request;
use crate::response::Response;
use crate::router::{Layer, ParamCallback, Route, Router};

/// Native registration API of an application or router instance.
pub trait Registrar {
    /// `method: None` registers for every method (`all`).
    fn register(&mut self, method: Option<Method>, path: &str, layer: Layer);

    /// Prefix registration (`use`).
    fn mount(&mut self, path: &str, layer: Layer);

    fn param(&mut self, name: &str, callback: ParamCallback);
}

/// Instances offering chained per-path registration (`route`).
pub trait Routable: Registrar {
    type Route: RouteRegistrar;

    fn route(&mut self, path: &str) -> Self::Route;
}

/// The object returned by [`Routable::route`].
pub trait RouteRegistrar {
    fn register(&mut self, method: Option<Method>, layer: Layer);
}

/// Constructs application and sub-router instances.
pub trait Framework {
    type Router: Registrar;

    fn application(&self) -> Self::Router;

    /// The sub-router constructor, if the framework has one.
    fn router(&self) -> Option<Self::Router> {
        None
    }
}

impl Registrar for Router {
    fn register(&mut self, method: Option<Method>, path: &str, layer: Layer) {
        match method {
            Some(method) => self.on(method, path, layer),
            None => self.all(path, layer),
        };
    }

    fn mount(&mut self, path: &str, layer: Layer) {
        Router::mount(self, path, layer);
    }

    fn param(&mut self, name: &str, callback: ParamCallback) {
        Router::param(self, name, callback);
    }
}

impl Routable for Router {
    type Route = Route;

    fn route(&mut self, path: &str) -> Route {
        Router::route(self, path)
    }
}

impl RouteRegistrar for Route {
    fn register(&mut self, method: Option<Method>, layer: Layer) {
        match method {
            Some(method) => self.on(method, layer),
            None => self.all(layer),
        };
    }
}

/// The built-in callback framework.
#[derive(Clone, Copy, Debug, Default)]
pub struct Native;

impl Framework for Native {
    type Router = Router;

    fn application(&self) -> Router {
        Router::new()
    }

    fn router(&self) -> Option<Router> {
        Some(Router::new())
    }
}

impl Native {
    /// A callback serving files below `root` for `GET` and `HEAD` requests.
    ///
    /// The request path (relative to the mount point) is resolved under
    /// `root`; paths escaping it are answered `403`. Anything that is not a
    /// regular file falls through with `next.call()`.
    pub fn serve_dir(
        &self,
        root: impl Into<PathBuf>,
    ) -> impl Fn(Request, Response, Next) + Clone + Send + Sync + 'static {
        let root: Arc<Path> = Arc::from(root.into());
        move |req: Request, res: Response, next: Next| {
            if !matches!(req.method(), Method::Get | Method::Head) {
                next.call();
                return;
            }
            let Some(relative) = sanitize(req.path()) else {
                res.send_status(StatusCode::FORBIDDEN);
                return;
            };
            let file = root.join(relative);
            tokio::spawn(async move {
                match tokio::fs::metadata(&file).await {
                    Ok(meta) if meta.is_file() => {}
                    _ => {
                        debug!(file = %file.display(), "no file to serve");
                        next.call();
                        return;
                    }
                }
                match tokio::fs::read(&file).await {
                    Ok(bytes) => {
                        res.set_header("content-type", content_type(&file));
                        if req.method() == Method::Head {
                            res.end();
                        } else {
                            res.send(bytes);
                        }
                    }
                    Err(e) => next.fail(e),
                }
            });
        }
    }
}

/// Turns a request path into a relative file path, refusing `..`.
fn sanitize(path: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(out)
}

fn content_type(file: &Path) -> &'static str {
    match file.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("txt" | "md" | "toml" | "rs") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_rejects_traversal() {
        assert_eq!(sanitize("/a/./b.txt"), Some(PathBuf::from("a/b.txt")));
        assert_eq!(sanitize("/"), Some(PathBuf::new()));
        assert_eq!(sanitize("/../etc/passwd"), None);
        assert_eq!(sanitize("/a/../../b"), None);
    }

    #[test]
    fn native_offers_a_sub_router_constructor() {
        assert!(Native.router().is_some());
    }
}
