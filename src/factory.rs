//! The entry point: a framework wrapped so that every instance it constructs
//! accepts every handler shape.

use std::ops::Deref;
use std::sync::Arc;

use tracing::debug;

use crate::convert::Converter;
use crate::coroutine::{Driver, TokioDriver};
use crate::framework::{Framework, Native};
use crate::intercept::Enhanced;

/// Wraps a [`Framework`].
///
/// Everything the framework exposes stays reachable through `Deref`; only the
/// constructors change, returning [`Enhanced`] instances.
///
/// ```rust,no_run
/// use coroute::{Error, Factory, Native, Request, Response, Server};
///
/// async fn home(_req: Request, res: Response) -> Result<(), Error> {
///     res.send("it works!");
///     Ok(())
/// }
///
/// #[tokio::main]
/// async fn main() -> Result<(), coroute::ServeError> {
///     let factory = Factory::new(Native);
///     let mut app = factory.application();
///     app.get("/", home);
///
///     Server::bind("127.0.0.1:3000").serve(app).await
/// }
/// ```
pub struct Factory<F> {
    framework: F,
    converter: Converter,
}

impl<F: Framework> Factory<F> {
    /// Drives coroutines on the current tokio runtime.
    pub fn new(framework: F) -> Self {
        Self::with_driver(framework, TokioDriver::new())
    }

    pub fn with_driver(framework: F, driver: impl Driver) -> Self {
        Self { framework, converter: Converter::new(Arc::new(driver)) }
    }

    /// Constructs an application instance.
    pub fn application(&self) -> Enhanced<F::Router> {
        debug!("constructing application");
        Enhanced::new(self.framework.application(), self.converter.clone())
    }

    /// Constructs a sub-router, when the framework has a router constructor.
    pub fn router(&self) -> Option<Enhanced<F::Router>> {
        let router = self.framework.router()?;
        debug!("constructing router");
        Some(Enhanced::new(router, self.converter.clone()))
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        self.converter.driver()
    }

    pub fn framework(&self) -> &F {
        &self.framework
    }
}

impl<F> Deref for Factory<F> {
    type Target = F;

    fn deref(&self) -> &F {
        &self.framework
    }
}

impl Default for Factory<Native> {
    fn default() -> Self {
        Self::new(Native)
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::framework::Registrar;
    use crate::method::Method;
    use crate::router::{Layer, ParamCallback};

    /// A framework without a router constructor.
    struct Bare;

    #[derive(Default)]
    struct Log(Vec<String>);

    impl Registrar for Log {
        fn register(&mut self, method: Option<Method>, path: &str, _layer: Layer) {
            self.0.push(format!("{method:?} {path}"));
        }

        fn mount(&mut self, path: &str, _layer: Layer) {
            self.0.push(format!("use {path}"));
        }

        fn param(&mut self, name: &str, _callback: ParamCallback) {
            self.0.push(format!("param {name}"));
        }
    }

    impl Framework for Bare {
        type Router = Log;

        fn application(&self) -> Log {
            Log::default()
        }
    }

    #[derive(Default)]
    struct Counting(Mutex<usize>);

    impl Driver for Arc<Counting> {
        fn spawn(&self, task: futures::future::BoxFuture<'static, ()>) {
            *self.0.lock() += 1;
            tokio::spawn(task);
        }
    }

    async fn noop(_req: crate::Request, _res: crate::Response) -> Result<(), crate::Error> {
        Ok(())
    }

    #[test]
    fn frameworks_without_routers_yield_none() {
        let factory = Factory::new(Bare);
        assert!(factory.router().is_none());

        let mut app = factory.application();
        app.get("/", noop);
        assert_eq!(app.0, vec!["Some(Get) /".to_owned()]);
    }

    #[test]
    fn native_factories_expose_both_constructors() {
        let factory = Factory::default();
        assert!(factory.router().is_some());
        // Static helpers stay reachable through the factory.
        let _serve = factory.serve_dir(".");
    }

    #[tokio::test]
    async fn injected_drivers_run_coroutines() {
        let counting = Arc::new(Counting::default());
        let factory = Factory::with_driver(Native, Arc::clone(&counting));
        let mut app = factory.application();
        app.get("/", noop);

        let request = http::Request::get("/").body(bytes::Bytes::new()).unwrap();
        let response = app.dispatch(request).await;
        assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
        assert_eq!(*counting.0.lock(), 1);
    }
}
