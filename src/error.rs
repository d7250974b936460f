//! Error types.
//!
//! [`Error`] is the value that travels down a middleware chain through
//! [`Next::fail`](crate::Next::fail). It is handed to error handlers exactly as
//! it was produced, including its optional numeric code and HTTP status.
//!
//! [`ServeError`] surfaces infrastructure failures: parsing the bind address,
//! binding the port, accepting connections.

use std::any::Any;
use std::borrow::Cow;
use std::error::Error as StdError;

use http::StatusCode;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// An error raised by a handler and forwarded to the error-handling chain.
///
/// ```rust
/// use coroute::Error;
///
/// let err = Error::new("Bang!").with_code(-100);
/// assert_eq!(err.message(), "Bang!");
/// assert_eq!(err.code(), Some(-100));
/// ```
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct Error {
    message: Cow<'static, str>,
    code: Option<i64>,
    status: Option<StatusCode>,
    #[source]
    source: Option<BoxError>,
}

impl Error {
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self { message: message.into(), code: None, status: None, source: None }
    }

    /// Wraps any error; the message is taken from its `Display` output.
    pub fn wrap(err: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            message: Cow::Owned(err.to_string()),
            code: None,
            status: None,
            source: Some(Box::new(err)),
        }
    }

    /// Converts a panic payload (from `catch_unwind`) into an error.
    ///
    /// `&str` and `String` payloads become the message; anything else is
    /// reported as an opaque panic.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(s) => Cow::Owned(*s),
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(s) => Cow::Borrowed(*s),
                Err(_) => Cow::Borrowed("handler panicked"),
            },
        };
        Self { message, code: None, status: Some(StatusCode::INTERNAL_SERVER_ERROR), source: None }
    }

    /// Attaches an application-defined numeric code.
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    /// Attaches the HTTP status the framework uses if no error handler
    /// answers the request.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn message(&self) -> &str { &self.message }
    pub fn code(&self) -> Option<i64> { self.code }
    pub fn status(&self) -> Option<StatusCode> { self.status }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::wrap(e)
    }
}

/// Failures of [`Server::serve`](crate::Server::serve).
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("invalid socket address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_become_messages() {
        let err = Error::from_panic(Box::new("boom"));
        assert_eq!(err.message(), "boom");
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));

        let err = Error::from_panic(Box::new(String::from("owned boom")));
        assert_eq!(err.message(), "owned boom");

        let err = Error::from_panic(Box::new(7_u8));
        assert_eq!(err.message(), "handler panicked");
    }

    #[test]
    fn wrapped_errors_keep_their_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = Error::from(io);
        assert_eq!(err.to_string(), "missing");
        assert!(err.source().is_some());
    }
}
