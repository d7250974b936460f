//! A small application mixing every handler shape.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/
//!   curl http://localhost:3000/users/42
//!   curl http://localhost:3000/users/abc
//!   curl -X DELETE http://localhost:3000/users/42
//!   curl http://localhost:3000/api/ping
//!   curl http://localhost:3000/static/Cargo.toml

use coroute::{Error, Factory, Native, Next, Request, Response, Server};
use http::StatusCode;

#[tokio::main]
async fn main() -> Result<(), coroute::ServeError> {
    tracing_subscriber::fmt::init();

    let factory = Factory::new(Native);
    let mut app = factory.application();

    // A plain callback, registered unchanged.
    app.use_(|req: Request, _res: Response, next: Next| {
        tracing::info!(method = %req.method(), path = req.path(), "request");
        next.call();
    });

    app.get("/", home)
        .param("user", load_user)
        .get("/users/:user", show_user)
        .del("/users/:user", delete_user);

    if let Some(mut api) = factory.router() {
        api.get("/ping", ping);
        app.use_at("/api", api);
    }

    app.use_at("/static", factory.serve_dir(env!("CARGO_MANIFEST_DIR")))
        .use_(report);

    Server::bind("0.0.0.0:3000").serve(app).await
}

async fn home(_req: Request, res: Response) -> Result<(), Error> {
    res.send("it works!");
    Ok(())
}

async fn load_user(req: Request, _res: Response, id: String) -> Result<(), Error> {
    let id: u64 = id
        .parse()
        .map_err(|_| Error::new(format!("invalid user id {id:?}")).with_status(StatusCode::BAD_REQUEST))?;
    req.set_local(id);
    Ok(())
}

async fn show_user(req: Request, res: Response) -> Result<(), Error> {
    let id: u64 = req.local().unwrap_or_default();
    res.json(format!(r#"{{"id":{id}}}"#));
    Ok(())
}

/// A task: it decides itself how the chain continues.
async fn delete_user(req: Request, res: Response, next: Next) -> Result<(), Error> {
    match req.local::<u64>() {
        Some(_) => res.send_status(StatusCode::NO_CONTENT),
        None => next.call(),
    }
    Ok(())
}

async fn ping(_req: Request, res: Response) -> Result<(), Error> {
    res.send("pong");
    Ok(())
}

async fn report(err: Error, _req: Request, res: Response) -> Result<(), Error> {
    let status = err.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    res.status(status).send(err.message().to_owned());
    Ok(())
}
