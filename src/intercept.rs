//! Registration methods that accept every handler shape.
//!
//! [`Enhanced`] wraps an application or router instance. Each registration
//! method converts its handler arguments with the [`Converter`] and forwards
//! the native results, in order, to the wrapped instance; paths, names and
//! native layers pass through as they are. Several handlers go in as a tuple:
//! `app.get("/", (auth, show))`.

use std::ops::Deref;

use tracing::debug;

use crate::convert::Converter;
use crate::framework::{Registrar, Routable, RouteRegistrar};
use crate::handler::{IntoMiddleware, IntoMiddlewareList, IntoParamHandler, Middleware, via};
use crate::method::Method;
use crate::router::{Layer, Router};

/// Generates one registration method per HTTP verb.
macro_rules! verbs {
    (path; $($name:ident => $method:ident),* $(,)?) => {
        $(
            #[doc = concat!("Registers handlers for `", stringify!($method), "` requests on `path`.")]
            pub fn $name<M>(&mut self, path: &str, handlers: impl IntoMiddlewareList<M>) -> &mut Self {
                self.on(Method::$method, path, handlers)
            }
        )*
    };
    (route; $($name:ident => $method:ident),* $(,)?) => {
        $(
            #[doc = concat!("Registers handlers for `", stringify!($method), "` requests on this route.")]
            pub fn $name<M>(&mut self, handlers: impl IntoMiddlewareList<M>) -> &mut Self {
                self.on(Method::$method, handlers)
            }
        )*
    };
}

/// An application or router whose registration methods accept callbacks,
/// tasks and coroutines alike.
///
/// ```rust,no_run
/// use coroute::{Error, Factory, Native, Request, Response};
///
/// async fn home(_req: Request, res: Response) -> Result<(), Error> {
///     res.send("it works!");
///     Ok(())
/// }
///
/// let factory = Factory::new(Native);
/// let mut app = factory.application();
/// app.get("/", home);
/// ```
#[derive(Clone)]
pub struct Enhanced<R> {
    inner: R,
    converter: Converter,
}

impl<R: Registrar> Enhanced<R> {
    /// Wraps `inner`; every later registration goes through `converter`.
    pub fn new(inner: R, converter: Converter) -> Self {
        Self { inner, converter }
    }

    /// Registers handlers for `method` requests on `path`.
    pub fn on<M>(&mut self, method: Method, path: &str, handlers: impl IntoMiddlewareList<M>) -> &mut Self {
        for layer in convert_all(&self.converter, handlers) {
            debug!(verb = method.verb(), path, kind = layer.kind(), "registering");
            self.inner.register(Some(method), path, layer);
        }
        self
    }

    verbs! {
        path;
        get => Get,
        post => Post,
        put => Put,
        delete => Delete,
        patch => Patch,
        head => Head,
        options => Options,
        connect => Connect,
        trace => Trace,
        copy => Copy,
        lock => Lock,
        mkcol => Mkcol,
        r#move => Move,
        propfind => Propfind,
        proppatch => Proppatch,
        unlock => Unlock,
        mkcalendar => Mkcalendar,
        report => Report,
        search => Search,
        purge => Purge,
    }

    /// Alias of [`delete`](Self::delete).
    pub fn del<M>(&mut self, path: &str, handlers: impl IntoMiddlewareList<M>) -> &mut Self {
        self.delete(path, handlers)
    }

    /// Registers handlers for every method on `path`.
    pub fn all<M>(&mut self, path: &str, handlers: impl IntoMiddlewareList<M>) -> &mut Self {
        for layer in convert_all(&self.converter, handlers) {
            self.inner.register(None, path, layer);
        }
        self
    }

    /// Registers handlers (or mounts routers) for every request: `use`.
    pub fn use_<M>(&mut self, handlers: impl IntoMiddlewareList<M>) -> &mut Self {
        self.use_at("/", handlers)
    }

    /// Registers handlers (or mounts routers) below `path`.
    pub fn use_at<M>(&mut self, path: &str, handlers: impl IntoMiddlewareList<M>) -> &mut Self {
        for layer in convert_all(&self.converter, handlers) {
            self.inner.mount(path, layer);
        }
        self
    }

    /// Registers a handler for the route parameter `name`.
    ///
    /// Coroutines are called as `(req, res, value)` and continue the chain
    /// when they complete; callbacks and tasks get `(req, res, next, value)`.
    pub fn param<M>(&mut self, name: &str, handler: impl IntoParamHandler<M>) -> &mut Self {
        let callback = self.converter.param(handler.into_param_handler());
        self.inner.param(name, callback);
        self
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Routable> Enhanced<R> {
    /// Starts a chain of registrations on `path`. The returned builder
    /// converts handlers the same way.
    pub fn route(&mut self, path: &str) -> EnhancedRoute<R::Route> {
        EnhancedRoute { inner: self.inner.route(path), converter: self.converter.clone() }
    }
}

impl<R> Deref for Enhanced<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.inner
    }
}

impl<R: Into<Layer>> IntoMiddleware<via::Value> for Enhanced<R> {
    fn into_middleware(self) -> Middleware {
        Middleware::Native(self.inner.into())
    }
}

impl From<Enhanced<Router>> for Router {
    fn from(enhanced: Enhanced<Router>) -> Self {
        enhanced.inner
    }
}

/// The chain builder returned by [`Enhanced::route`].
pub struct EnhancedRoute<T> {
    inner: T,
    converter: Converter,
}

impl<T: RouteRegistrar> EnhancedRoute<T> {
    pub fn on<M>(&mut self, method: Method, handlers: impl IntoMiddlewareList<M>) -> &mut Self {
        for layer in convert_all(&self.converter, handlers) {
            debug!(verb = method.verb(), kind = layer.kind(), "registering on route");
            self.inner.register(Some(method), layer);
        }
        self
    }

    verbs! {
        route;
        get => Get,
        post => Post,
        put => Put,
        delete => Delete,
        patch => Patch,
        head => Head,
        options => Options,
        connect => Connect,
        trace => Trace,
        copy => Copy,
        lock => Lock,
        mkcol => Mkcol,
        r#move => Move,
        propfind => Propfind,
        proppatch => Proppatch,
        unlock => Unlock,
        mkcalendar => Mkcalendar,
        report => Report,
        search => Search,
        purge => Purge,
    }

    pub fn del<M>(&mut self, handlers: impl IntoMiddlewareList<M>) -> &mut Self {
        self.delete(handlers)
    }

    pub fn all<M>(&mut self, handlers: impl IntoMiddlewareList<M>) -> &mut Self {
        for layer in convert_all(&self.converter, handlers) {
            self.inner.register(None, layer);
        }
        self
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

fn convert_all<M>(converter: &Converter, handlers: impl IntoMiddlewareList<M>) -> Vec<Layer> {
    handlers.into_middleware_list().into_iter().map(|m| converter.middleware(m)).collect()
}
