//! Turning handler shapes into native callbacks.
//!
//! Callbacks pass through untouched. Tasks and coroutines are wrapped in a
//! callback that starts the handler, drives its future on the [`Driver`] and
//! translates the outcome into exactly one `next` call:
//!
//! - a panic while starting the handler, an `Err`, or a panic inside the
//!   future: `next.fail(err)` with the error as produced;
//! - a coroutine completing: `next.call()`, unless the response has been sent;
//! - a task completing: nothing, the task calls `next` itself.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread;

use tracing::{debug, trace};

use crate::coroutine::{Driver, spawn_driven};
use crate::error::Error;
use crate::handler::{ErrorHandler, Handler, HandlerFuture, Middleware, ParamHandler};
use crate::next::Next;
use crate::request::Request;
use crate::response::Response;
use crate::router::{Callback, ErrorCallback, Layer, ParamCallback};

/// Converts handlers of any shape into native callbacks.
#[derive(Clone)]
pub struct Converter {
    driver: Arc<dyn Driver>,
}

impl Converter {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Converts an argument of a verb, `all` or `use` registration.
    pub fn middleware(&self, middleware: Middleware) -> Layer {
        match middleware {
            Middleware::Handler(handler) => Layer::Callback(self.handler(handler)),
            Middleware::Error(handler) => Layer::ErrorCallback(self.error_handler(handler)),
            Middleware::Native(layer) => layer,
        }
    }

    pub fn handler(&self, handler: Handler) -> Callback {
        debug!(shape = ?handler.shape(), "converting handler");
        match handler {
            Handler::Callback(callback) => callback,
            Handler::Task(task) => {
                let driver = Arc::clone(&self.driver);
                Arc::new(move |req: Request, res: Response, next: Next| {
                    let guard = next.clone();
                    let started = catch_unwind(AssertUnwindSafe(|| task(req, res, next)));
                    finish_task(&*driver, started, guard);
                })
            }
            Handler::Coroutine(coroutine) => {
                let driver = Arc::clone(&self.driver);
                Arc::new(move |req: Request, res: Response, next: Next| {
                    let sent = res.clone();
                    let started = catch_unwind(AssertUnwindSafe(|| coroutine(req, res)));
                    finish_coroutine(&*driver, started, sent, next);
                })
            }
        }
    }

    pub fn error_handler(&self, handler: ErrorHandler) -> ErrorCallback {
        debug!(shape = ?handler.shape(), "converting error handler");
        match handler {
            ErrorHandler::Callback(callback) => callback,
            ErrorHandler::Task(task) => {
                let driver = Arc::clone(&self.driver);
                Arc::new(move |err: Error, req: Request, res: Response, next: Next| {
                    let guard = next.clone();
                    let started = catch_unwind(AssertUnwindSafe(|| task(err, req, res, next)));
                    finish_task(&*driver, started, guard);
                })
            }
            ErrorHandler::Coroutine(coroutine) => {
                let driver = Arc::clone(&self.driver);
                Arc::new(move |err: Error, req: Request, res: Response, next: Next| {
                    let sent = res.clone();
                    let started = catch_unwind(AssertUnwindSafe(|| coroutine(err, req, res)));
                    finish_coroutine(&*driver, started, sent, next);
                })
            }
        }
    }

    pub fn param(&self, handler: ParamHandler) -> ParamCallback {
        debug!(shape = ?handler.shape(), "converting param handler");
        match handler {
            ParamHandler::Callback(callback) => callback,
            ParamHandler::Task(task) => {
                let driver = Arc::clone(&self.driver);
                Arc::new(move |req: Request, res: Response, next: Next, value: String| {
                    let guard = next.clone();
                    let started = catch_unwind(AssertUnwindSafe(|| task(req, res, next, value)));
                    finish_task(&*driver, started, guard);
                })
            }
            ParamHandler::Coroutine(coroutine) => {
                let driver = Arc::clone(&self.driver);
                Arc::new(move |req: Request, res: Response, next: Next, value: String| {
                    let sent = res.clone();
                    let started = catch_unwind(AssertUnwindSafe(|| coroutine(req, res, value)));
                    finish_coroutine(&*driver, started, sent, next);
                })
            }
        }
    }
}

fn finish_task(driver: &dyn Driver, started: thread::Result<HandlerFuture>, next: Next) {
    match started {
        Err(panic) => next.fail(Error::from_panic(panic)),
        Ok(future) => spawn_driven(driver, future, move |outcome| {
            if let Err(err) = outcome {
                next.fail(err);
            }
        }),
    }
}

fn finish_coroutine(
    driver: &dyn Driver,
    started: thread::Result<HandlerFuture>,
    res: Response,
    next: Next,
) {
    let future = match started {
        Ok(future) => future,
        Err(panic) => return next.fail(Error::from_panic(panic)),
    };
    spawn_driven(driver, future, move |outcome| match outcome {
        Ok(()) if res.is_finished() => trace!("response sent, chain stops here"),
        Ok(()) => next.call(),
        Err(err) => next.fail(err),
    });
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::HeaderMap;
    use tokio::sync::oneshot;

    use super::*;
    use crate::coroutine::TokioDriver;
    use crate::method::Method;
    use crate::next::Signal;

    fn converter() -> Converter {
        Converter::new(Arc::new(TokioDriver::new()))
    }

    fn exchange() -> (Request, Response, Next, Signal, oneshot::Receiver<crate::response::HttpResponse>) {
        let req = Request::new(Method::Get, "/".parse().unwrap(), HeaderMap::new(), Bytes::new());
        let (res, sent) = Response::channel();
        let (next, signal) = Next::channel();
        (req, res, next, signal, sent)
    }

    #[test]
    fn callbacks_pass_through_unchanged() {
        let callback: Callback = Arc::new(|_req: Request, _res: Response, next: Next| next.call());
        let converted = converter().handler(Handler::Callback(Arc::clone(&callback)));
        assert!(Arc::ptr_eq(&callback, &converted));
    }

    #[tokio::test]
    async fn finished_coroutines_call_next() {
        let callback = converter().handler(Handler::coroutine(|_req, _res| async { Ok(()) }));
        let (req, res, next, signal, _sent) = exchange();

        callback(req, res, next);
        assert!(matches!(signal.await, Ok(None)));
    }

    #[tokio::test]
    async fn coroutines_that_send_do_not_call_next() {
        let callback = converter().handler(Handler::coroutine(|_req, res: Response| async move {
            res.send("it works!");
            Ok(())
        }));
        let (req, res, next, signal, sent) = exchange();

        callback(req, res, next);
        assert!(sent.await.is_ok());
        // Every `Next` clone is dropped without a call.
        assert!(signal.await.is_err());
    }

    #[tokio::test]
    async fn coroutine_errors_reach_next_untouched() {
        let callback = converter().handler(Handler::coroutine(|_req, _res| async {
            Err(Error::new("Bang!").with_code(-100))
        }));
        let (req, res, next, signal, _sent) = exchange();

        callback(req, res, next);
        let err = signal.await.unwrap().unwrap();
        assert_eq!(err.message(), "Bang!");
        assert_eq!(err.code(), Some(-100));
    }

    #[tokio::test]
    async fn panics_inside_tasks_reach_next() {
        async fn explode(_req: Request, _res: Response, _next: Next) -> Result<(), Error> {
            panic!("task blew up")
        }

        let callback = converter().handler(Handler::task(explode));
        let (req, res, next, signal, _sent) = exchange();

        callback(req, res, next);
        assert_eq!(signal.await.unwrap().unwrap().message(), "task blew up");
    }

    type Ready = futures::future::Ready<Result<(), Error>>;

    #[tokio::test]
    async fn panics_before_the_future_exists_reach_next() {
        let converter = converter();
        let task = converter.handler(Handler::task(|_req: Request, _res: Response, _next: Next| -> Ready {
            panic!("task Bang!")
        }));
        let coroutine = converter.handler(Handler::coroutine(|_req: Request, _res: Response| -> Ready {
            panic!("coroutine Bang!")
        }));

        let (req, res, next, signal, _sent) = exchange();
        task(req, res, next);
        assert_eq!(signal.await.unwrap().unwrap().message(), "task Bang!");

        let (req, res, next, signal, _sent) = exchange();
        coroutine(req, res, next);
        assert_eq!(signal.await.unwrap().unwrap().message(), "coroutine Bang!");
    }

    #[tokio::test]
    async fn error_and_param_handlers_panicking_early_reach_next() {
        let converter = converter();
        let recover = converter.error_handler(ErrorHandler::coroutine(
            |_err: Error, _req: Request, _res: Response| -> Ready { panic!("recover Bang!") },
        ));
        let load = converter.param(ParamHandler::coroutine(
            |_req: Request, _res: Response, id: String| -> Ready { panic!("no user {id}") },
        ));
        let check = converter.param(ParamHandler::task(
            |_req: Request, _res: Response, _next: Next, _id: String| -> Ready { panic!("check Bang!") },
        ));

        let (req, res, next, signal, _sent) = exchange();
        recover(Error::new("earlier"), req, res, next);
        assert_eq!(signal.await.unwrap().unwrap().message(), "recover Bang!");

        let (req, res, next, signal, _sent) = exchange();
        load(req, res, next, "41".to_owned());
        let err = signal.await.unwrap().unwrap();
        assert_eq!(err.message(), "no user 41");
        assert_eq!(err.status(), Some(http::StatusCode::INTERNAL_SERVER_ERROR));

        let (req, res, next, signal, _sent) = exchange();
        check(req, res, next, "41".to_owned());
        assert_eq!(signal.await.unwrap().unwrap().message(), "check Bang!");
    }

    #[tokio::test]
    async fn successful_tasks_leave_next_to_the_handler() {
        let callback = converter().handler(Handler::task(|_req, _res, next: Next| async move {
            next.call();
            Ok(())
        }));
        let (req, res, next, signal, _sent) = exchange();

        callback(req, res, next.clone());
        assert!(matches!(signal.await, Ok(None)));
        assert!(next.is_spent());
    }

    #[tokio::test]
    async fn error_coroutines_clear_the_error_on_completion() {
        let callback = converter().error_handler(ErrorHandler::coroutine(|err: Error, _req, _res| async move {
            assert_eq!(err.message(), "earlier");
            Ok(())
        }));
        let (req, res, next, signal, _sent) = exchange();

        callback(Error::new("earlier"), req, res, next);
        assert!(matches!(signal.await, Ok(None)));
    }

    #[tokio::test]
    async fn param_coroutines_receive_the_value_last() {
        let callback = converter().param(ParamHandler::coroutine(|_req, _res, id: String| async move {
            if id == "42" { Ok(()) } else { Err(Error::new(format!("unexpected id {id}"))) }
        }));

        let (req, res, next, signal, _sent) = exchange();
        callback(req, res, next, "42".to_owned());
        assert!(matches!(signal.await, Ok(None)));

        let (req, res, next, signal, _sent) = exchange();
        callback(req, res, next, "41".to_owned());
        assert_eq!(signal.await.unwrap().unwrap().message(), "unexpected id 41");
    }
}
