//! Handler shapes and the traits that pick one from a function signature.
//!
//! # Shapes
//!
//! Every registration site accepts three kinds of function, told apart by
//! their signature rather than by inspecting them at runtime:
//!
//! | Shape | Arguments | Returns | Chain continues when |
//! |---|---|---|---|
//! | callback | `(Request, Response, Next)` | `()` | `next` is called |
//! | task | `(Request, Response, Next)` | [`HandlerFuture`]-like | `next` is called; `Err` fails it |
//! | coroutine | `(Request, Response)` | [`HandlerFuture`]-like | the future completes unsent |
//!
//! "[`HandlerFuture`]-like" is any `Future<Output = Result<(), Error>> + Send`.
//!
//! Error handlers take a leading [`Error`]; parameter handlers take the route
//! parameter value last (the coroutine form drops `Next`).
//!
//! # How a signature becomes a shape
//!
//! ```text
//! async fn home(req: Request, res: Response) -> Result<(), Error>  ← user writes this
//!        ↓ app.get("/", home)
//! home.into_middleware()            ← IntoMiddleware<(via::Coroutine, Fut)> blanket impl
//!        ↓
//! Middleware::Handler(Handler::Coroutine(Arc<dyn Fn ..>))
//!        ↓ Converter::middleware
//! Layer::Callback(..)               ← a plain native callback
//! ```
//!
//! The marker parameter `M` exists only so the blanket impls for different
//! signatures do not overlap; it is always inferred.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::Error;
use crate::next::Next;
use crate::request::Request;
use crate::response::Response;
use crate::router::{Callback, ErrorCallback, Layer, ParamCallback, Router};

/// The boxed future produced by task and coroutine handlers.
pub type HandlerFuture = BoxFuture<'static, Result<(), Error>>;

type TaskFn = Arc<dyn Fn(Request, Response, Next) -> HandlerFuture + Send + Sync + 'static>;
type CoroutineFn = Arc<dyn Fn(Request, Response) -> HandlerFuture + Send + Sync + 'static>;

type ErrorTaskFn = Arc<dyn Fn(Error, Request, Response, Next) -> HandlerFuture + Send + Sync + 'static>;
type ErrorCoroutineFn = Arc<dyn Fn(Error, Request, Response) -> HandlerFuture + Send + Sync + 'static>;

type ParamTaskFn = Arc<dyn Fn(Request, Response, Next, String) -> HandlerFuture + Send + Sync + 'static>;
type ParamCoroutineFn = Arc<dyn Fn(Request, Response, String) -> HandlerFuture + Send + Sync + 'static>;

/// How a handler reports completion.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Shape {
    Callback,
    Task,
    Coroutine,
}

// ── Handler kinds ─────────────────────────────────────────────────────────────

/// A handler for the `(req, res, next)` context.
#[derive(Clone)]
pub enum Handler {
    Callback(Callback),
    Task(TaskFn),
    Coroutine(CoroutineFn),
}

impl Handler {
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(Request, Response, Next) + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }

    pub fn task<F, Fut>(f: F) -> Self
    where
        F: Fn(Request, Response, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        Self::Task(Arc::new(move |req: Request, res: Response, next: Next| -> HandlerFuture {
            Box::pin(f(req, res, next))
        }))
    }

    pub fn coroutine<F, Fut>(f: F) -> Self
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        Self::Coroutine(Arc::new(move |req: Request, res: Response| -> HandlerFuture {
            Box::pin(f(req, res))
        }))
    }

    pub fn shape(&self) -> Shape {
        match self {
            Self::Callback(_) => Shape::Callback,
            Self::Task(_) => Shape::Task,
            Self::Coroutine(_) => Shape::Coroutine,
        }
    }
}

/// A handler for the error-aware `(err, req, res, next)` context.
#[derive(Clone)]
pub enum ErrorHandler {
    Callback(ErrorCallback),
    Task(ErrorTaskFn),
    Coroutine(ErrorCoroutineFn),
}

impl ErrorHandler {
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(Error, Request, Response, Next) + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }

    pub fn task<F, Fut>(f: F) -> Self
    where
        F: Fn(Error, Request, Response, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        Self::Task(Arc::new(move |err: Error, req: Request, res: Response, next: Next| -> HandlerFuture {
            Box::pin(f(err, req, res, next))
        }))
    }

    pub fn coroutine<F, Fut>(f: F) -> Self
    where
        F: Fn(Error, Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        Self::Coroutine(Arc::new(move |err: Error, req: Request, res: Response| -> HandlerFuture {
            Box::pin(f(err, req, res))
        }))
    }

    pub fn shape(&self) -> Shape {
        match self {
            Self::Callback(_) => Shape::Callback,
            Self::Task(_) => Shape::Task,
            Self::Coroutine(_) => Shape::Coroutine,
        }
    }
}

/// A handler for the `(req, res, next, value)` parameter context.
#[derive(Clone)]
pub enum ParamHandler {
    Callback(ParamCallback),
    Task(ParamTaskFn),
    /// Called as `(req, res, value)`; completion continues the chain.
    Coroutine(ParamCoroutineFn),
}

impl ParamHandler {
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(Request, Response, Next, String) + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }

    pub fn task<F, Fut>(f: F) -> Self
    where
        F: Fn(Request, Response, Next, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        Self::Task(Arc::new(move |req: Request, res: Response, next: Next, value: String| -> HandlerFuture {
            Box::pin(f(req, res, next, value))
        }))
    }

    pub fn coroutine<F, Fut>(f: F) -> Self
    where
        F: Fn(Request, Response, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        Self::Coroutine(Arc::new(move |req: Request, res: Response, value: String| -> HandlerFuture {
            Box::pin(f(req, res, value))
        }))
    }

    pub fn shape(&self) -> Shape {
        match self {
            Self::Callback(_) => Shape::Callback,
            Self::Task(_) => Shape::Task,
            Self::Coroutine(_) => Shape::Coroutine,
        }
    }
}

/// Anything accepted by the verb, `all` and `use` registration methods.
#[derive(Clone)]
pub enum Middleware {
    Handler(Handler),
    Error(ErrorHandler),
    /// Already native (a mounted router, a prebuilt layer): passed through.
    Native(Layer),
}

// ── Conversion traits ─────────────────────────────────────────────────────────

/// Implemented for every value the verb, `all` and `use` methods accept.
pub trait IntoMiddleware<M> {
    fn into_middleware(self) -> Middleware;
}

/// Implemented for every value `param` accepts.
pub trait IntoParamHandler<M> {
    fn into_param_handler(self) -> ParamHandler;
}

/// Implemented for one handler or a tuple of handlers of any shapes, so a
/// single registration can install several layers in order:
/// `app.get("/", (auth, load, show))`.
pub trait IntoMiddlewareList<M> {
    fn into_middleware_list(self) -> Vec<Middleware>;
}

impl<T, M> IntoMiddlewareList<via::One<M>> for T
where
    T: IntoMiddleware<M>,
{
    fn into_middleware_list(self) -> Vec<Middleware> {
        vec![self.into_middleware()]
    }
}

macro_rules! middleware_tuples {
    ($(($($handler:ident $marker:ident),+)),+ $(,)?) => {
        $(
            impl<$($handler, $marker),+> IntoMiddlewareList<($($marker,)+)> for ($($handler,)+)
            where
                $($handler: IntoMiddleware<$marker>,)+
            {
                #[allow(non_snake_case)]
                fn into_middleware_list(self) -> Vec<Middleware> {
                    let ($($handler,)+) = self;
                    vec![$($handler.into_middleware()),+]
                }
            }
        )+
    };
}

middleware_tuples! {
    (A MA),
    (A MA, B MB),
    (A MA, B MB, C MC),
    (A MA, B MB, C MC, D MD),
    (A MA, B MB, C MC, D MD, E ME),
    (A MA, B MB, C MC, D MD, E ME, F MF),
    (A MA, B MB, C MC, D MD, E ME, F MF, G MG),
    (A MA, B MB, C MC, D MD, E ME, F MF, G MG, H MH),
}

/// Marker types keeping the blanket impls apart.
#[doc(hidden)]
pub mod via {
    use std::marker::PhantomData;

    pub struct One<M>(PhantomData<M>);
    pub struct Value;
    pub struct Callback;
    pub struct Task;
    pub struct Coroutine;
    pub struct ErrorCallback;
    pub struct ErrorTask;
    pub struct ErrorCoroutine;
}

impl IntoMiddleware<via::Value> for Middleware {
    fn into_middleware(self) -> Middleware { self }
}

impl IntoMiddleware<via::Value> for Handler {
    fn into_middleware(self) -> Middleware { Middleware::Handler(self) }
}

impl IntoMiddleware<via::Value> for ErrorHandler {
    fn into_middleware(self) -> Middleware { Middleware::Error(self) }
}

impl IntoMiddleware<via::Value> for Layer {
    fn into_middleware(self) -> Middleware { Middleware::Native(self) }
}

impl IntoMiddleware<via::Value> for Router {
    fn into_middleware(self) -> Middleware { Middleware::Native(Layer::Router(self)) }
}

impl<F> IntoMiddleware<via::Callback> for F
where
    F: Fn(Request, Response, Next) + Send + Sync + 'static,
{
    fn into_middleware(self) -> Middleware {
        Middleware::Handler(Handler::callback(self))
    }
}

impl<F, Fut> IntoMiddleware<(via::Task, Fut)> for F
where
    F: Fn(Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    fn into_middleware(self) -> Middleware {
        Middleware::Handler(Handler::task(self))
    }
}

impl<F, Fut> IntoMiddleware<(via::Coroutine, Fut)> for F
where
    F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    fn into_middleware(self) -> Middleware {
        Middleware::Handler(Handler::coroutine(self))
    }
}

impl<F> IntoMiddleware<via::ErrorCallback> for F
where
    F: Fn(Error, Request, Response, Next) + Send + Sync + 'static,
{
    fn into_middleware(self) -> Middleware {
        Middleware::Error(ErrorHandler::callback(self))
    }
}

impl<F, Fut> IntoMiddleware<(via::ErrorTask, Fut)> for F
where
    F: Fn(Error, Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    fn into_middleware(self) -> Middleware {
        Middleware::Error(ErrorHandler::task(self))
    }
}

impl<F, Fut> IntoMiddleware<(via::ErrorCoroutine, Fut)> for F
where
    F: Fn(Error, Request, Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    fn into_middleware(self) -> Middleware {
        Middleware::Error(ErrorHandler::coroutine(self))
    }
}

impl IntoParamHandler<via::Value> for ParamHandler {
    fn into_param_handler(self) -> ParamHandler { self }
}

impl<F> IntoParamHandler<via::Callback> for F
where
    F: Fn(Request, Response, Next, String) + Send + Sync + 'static,
{
    fn into_param_handler(self) -> ParamHandler {
        ParamHandler::callback(self)
    }
}

impl<F, Fut> IntoParamHandler<(via::Task, Fut)> for F
where
    F: Fn(Request, Response, Next, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    fn into_param_handler(self) -> ParamHandler {
        ParamHandler::task(self)
    }
}

impl<F, Fut> IntoParamHandler<(via::Coroutine, Fut)> for F
where
    F: Fn(Request, Response, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    fn into_param_handler(self) -> ParamHandler {
        ParamHandler::coroutine(self)
    }
}
