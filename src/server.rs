//! HTTP server and graceful shutdown.
//!
//! On SIGTERM or Ctrl-C (or when the future given to
//! [`Server::serve_with_shutdown`] resolves) the server:
//! 1. stops accepting connections;
//! 2. lets every in-flight connection run to completion;
//! 3. returns from `serve`.

use std::convert::Infallible;
use std::future::Future;
use std::net::{AddrParseError, SocketAddr};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::error::ServeError;
use crate::router::Router;

enum Source {
    Addr(Result<SocketAddr, AddrParseError>),
    Listener(TcpListener),
}

/// The HTTP server.
pub struct Server {
    source: Source,
}

impl Server {
    /// Configures the server to bind to `addr` when it starts serving.
    /// An invalid address is reported by [`serve`](Server::serve).
    ///
    /// ```rust,no_run
    /// use coroute::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: &str) -> Self {
        Self { source: Source::Addr(addr.parse()) }
    }

    /// Serves on an already bound listener.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { source: Source::Listener(listener) }
    }

    /// Accepts connections and dispatches them through `router` until
    /// SIGTERM or Ctrl-C, then drains in-flight connections.
    pub async fn serve(self, router: impl Into<Router>) -> Result<(), ServeError> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), stopping when `shutdown` resolves.
    pub async fn serve_with_shutdown(
        self,
        router: impl Into<Router>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), ServeError> {
        let listener = match self.source {
            Source::Addr(addr) => TcpListener::bind(addr?).await?,
            Source::Listener(listener) => listener,
        };
        let router = router.into();

        info!(addr = %listener.local_addr()?, "coroute listening");

        let mut tasks = tokio::task::JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Shutdown first, so queued connections are not accepted.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, peer) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = router.clone();
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let router = router.clone();
                            async move { dispatch(router, req, peer).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(%peer, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connections.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("coroute stopped");
        Ok(())
    }
}

/// Buffers the body and runs one request through the router.
async fn dispatch(
    router: Router,
    req: hyper::Request<Incoming>,
    peer: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    debug!(%peer, method = %parts.method, path = parts.uri.path(), "request");

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(%peer, "failed to read request body: {e}");
            let mut response = http::Response::new(Full::new(Bytes::from_static(b"Bad Request")));
            *response.status_mut() = http::StatusCode::BAD_REQUEST;
            return Ok(response);
        }
    };

    Ok(router.dispatch(http::Request::from_parts(parts, body)).await)
}

/// Resolves on the first SIGTERM or SIGINT. Only Ctrl-C on non-Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = sigterm => {}
    }
}
