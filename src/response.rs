//! Outgoing HTTP response handle.
//!
//! Every handler of a request gets a clone of the same [`Response`]. The first
//! `send*` call finishes it: the assembled `http::Response` is handed to the
//! server straight away, even if the middleware chain keeps running, and the
//! finished-state flag flips so later handlers can tell the request is done.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::warn;

/// The response type handed to hyper.
pub(crate) type HttpResponse = http::Response<Full<Bytes>>;

/// A shared, finishable HTTP response.
///
/// ```rust,no_run
/// use coroute::{Request, Response, Next};
/// use http::StatusCode;
///
/// fn created(_req: Request, res: Response, _next: Next) {
///     res.status(StatusCode::CREATED)
///         .set_header("location", "/users/42")
///         .json(br#"{"id":42}"#.to_vec());
/// }
/// ```
#[derive(Clone)]
pub struct Response {
    shared: Arc<Shared>,
}

struct Shared {
    finished: AtomicBool,
    head: Mutex<Head>,
    sink: Mutex<Option<oneshot::Sender<HttpResponse>>>,
}

struct Head {
    status: StatusCode,
    headers: HeaderMap,
}

impl Response {
    /// Creates a response and the receiver the server awaits.
    ///
    /// The receiver errors if every clone of the response is dropped unsent.
    pub(crate) fn channel() -> (Self, oneshot::Receiver<HttpResponse>) {
        let (tx, rx) = oneshot::channel();
        let shared = Shared {
            finished: AtomicBool::new(false),
            head: Mutex::new(Head { status: StatusCode::OK, headers: HeaderMap::new() }),
            sink: Mutex::new(Some(tx)),
        };
        (Self { shared: Arc::new(shared) }, rx)
    }

    /// Whether the response has already been sent.
    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::Acquire)
    }

    pub fn status_code(&self) -> StatusCode {
        self.shared.head.lock().status
    }

    pub fn status(&self, status: StatusCode) -> &Self {
        self.shared.head.lock().status = status;
        self
    }

    /// Sets a header, replacing earlier values. Invalid names or values are
    /// dropped with a warning.
    pub fn set_header(&self, name: &str, value: &str) -> &Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.shared.head.lock().headers.insert(name, value);
            }
            _ => warn!(header = name, "ignoring invalid response header"),
        }
        self
    }

    /// Finishes the response with `body`, defaulting the content type to
    /// `text/plain; charset=utf-8`.
    pub fn send(&self, body: impl Into<Bytes>) {
        self.finish(Some("text/plain; charset=utf-8"), body.into());
    }

    /// Finishes the response with a JSON body.
    pub fn json(&self, body: impl Into<Bytes>) {
        self.finish(Some("application/json"), body.into());
    }

    /// Sets `status` and finishes with its reason phrase as the body.
    pub fn send_status(&self, status: StatusCode) {
        self.status(status);
        let reason = status.canonical_reason().unwrap_or_default();
        self.finish(Some("text/plain; charset=utf-8"), Bytes::from_static(reason.as_bytes()));
    }

    /// Finishes the response without a body.
    pub fn end(&self) {
        self.finish(None, Bytes::new());
    }

    fn finish(&self, default_type: Option<&'static str>, body: Bytes) {
        if self.shared.finished.swap(true, Ordering::AcqRel) {
            warn!("response already finished, ignoring second send");
            return;
        }

        let Head { status, mut headers } = {
            let mut head = self.shared.head.lock();
            Head { status: head.status, headers: std::mem::take(&mut head.headers) }
        };
        if let Some(content_type) = default_type {
            headers.entry(CONTENT_TYPE).or_insert(HeaderValue::from_static(content_type));
        }

        let mut response = http::Response::new(Full::new(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;

        if let Some(sink) = self.shared.sink.lock().take() {
            // The server may have given up on the request already.
            let _ = sink.send(response);
        }
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status_code())
            .field("finished", &self.is_finished())
            .finish()
    }
}
