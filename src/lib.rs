//! # coroute
//!
//! Write HTTP middleware as `async fn`s and register them with a
//! callback-style router.
//!
//! Express-style routers call middleware as `(req, res, next)` and expect
//! `next` to be called exactly once to continue. A [`Factory`] wraps a
//! [`Framework`] so that every application and router it constructs accepts,
//! wherever a callback is accepted:
//!
//! - **callbacks** `Fn(Request, Response, Next)`, registered unchanged;
//! - **tasks** `async fn(Request, Response, Next) -> Result<(), Error>`; an
//!   `Err` becomes `next.fail(err)`;
//! - **coroutines** `async fn(Request, Response) -> Result<(), Error>`;
//!   completing continues the chain unless the response was sent, and an
//!   `Err` becomes `next.fail(err)`.
//!
//! Error handlers take a leading [`Error`], param handlers a trailing value.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use coroute::{Error, Factory, Native, Request, Response, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), coroute::ServeError> {
//!     let factory = Factory::new(Native);
//!     let mut app = factory.application();
//!
//!     app.param("user", load_user)
//!         .get("/users/:user", show_user)
//!         .use_(report);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await
//! }
//!
//! async fn load_user(req: Request, _res: Response, id: String) -> Result<(), Error> {
//!     let id: u64 = id.parse().map_err(Error::wrap)?;
//!     req.set_local(id);
//!     Ok(())
//! }
//!
//! async fn show_user(req: Request, res: Response) -> Result<(), Error> {
//!     let id: u64 = req.local().unwrap_or_default();
//!     res.send(format!("user {id}"));
//!     Ok(())
//! }
//!
//! async fn report(err: Error, _req: Request, res: Response) -> Result<(), Error> {
//!     res.status(http::StatusCode::BAD_REQUEST).send(err.to_string());
//!     Ok(())
//! }
//! ```

mod convert;
mod error;
mod factory;
mod framework;
mod handler;
mod intercept;
mod method;
mod next;
mod request;
mod response;
mod router;
mod server;

pub mod coroutine;

pub use convert::Converter;
pub use error::{Error, ServeError};
pub use factory::Factory;
pub use framework::{Framework, Native, Registrar, Routable, RouteRegistrar};
pub use handler::{
    ErrorHandler, Handler, HandlerFuture, IntoMiddleware, IntoMiddlewareList, IntoParamHandler, Middleware,
    ParamHandler, Shape, via,
};
pub use intercept::{Enhanced, EnhancedRoute};
pub use method::Method;
pub use next::Next;
pub use request::Request;
pub use response::Response;
pub use router::{Callback, ErrorCallback, Layer, ParamCallback, Route, Router};
pub use server::Server;
