//! Driving suspendable handler computations to completion.
//!
//! A converted coroutine or task handler is a plain callback on the outside;
//! inside, it hands its future to a [`Driver`] and reacts to the outcome.
//! [`drive`] is the shared completion semantics: the future's own result, with
//! a panic anywhere inside it turned into an [`Error`].

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::runtime::Handle;

use crate::error::Error;

/// Runs detached handler computations.
pub trait Driver: Send + Sync + 'static {
    fn spawn(&self, task: BoxFuture<'static, ()>);
}

/// Spawns onto a tokio runtime: the one given to
/// [`with_handle`](TokioDriver::with_handle), or the runtime current at the
/// time of the spawn.
#[derive(Clone, Debug, Default)]
pub struct TokioDriver {
    handle: Option<Handle>,
}

impl TokioDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handle(handle: Handle) -> Self {
        Self { handle: Some(handle) }
    }
}

impl Driver for TokioDriver {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        match &self.handle {
            Some(handle) => drop(handle.spawn(task)),
            None => drop(tokio::spawn(task)),
        }
    }
}

/// Awaits `future`, converting a panic into an error.
///
/// ```rust
/// # #[tokio::main] async fn main() {
/// use coroute::coroutine::drive;
///
/// async fn explode() -> Result<(), coroute::Error> {
///     panic!("Bang!")
/// }
///
/// let outcome = drive(explode()).await;
/// assert_eq!(outcome.unwrap_err().message(), "Bang!");
/// # }
/// ```
pub async fn drive<F>(future: F) -> Result<(), Error>
where
    F: Future<Output = Result<(), Error>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => Err(Error::from_panic(panic)),
    }
}

/// Drives `future` on `driver` and reports the outcome to `done`.
pub(crate) fn spawn_driven<F, D>(driver: &dyn Driver, future: F, done: D)
where
    F: Future<Output = Result<(), Error>> + Send + 'static,
    D: FnOnce(Result<(), Error>) + Send + 'static,
{
    driver.spawn(Box::pin(async move { done(drive(future).await) }));
}

#[cfg(test)]
mod tests {
    use tokio::sync::oneshot;

    use super::*;

    #[tokio::test]
    async fn drive_passes_errors_through_untouched() {
        let outcome = drive(async { Err(Error::new("Bang!").with_code(-100)) }).await;
        let err = outcome.unwrap_err();
        assert_eq!(err.message(), "Bang!");
        assert_eq!(err.code(), Some(-100));
    }

    #[tokio::test]
    async fn spawned_futures_report_their_outcome() {
        let (tx, rx) = oneshot::channel();
        spawn_driven(&TokioDriver::new(), async { Ok(()) }, move |outcome| {
            let _ = tx.send(outcome.is_ok());
        });
        assert!(rx.await.unwrap());
    }

    #[test]
    fn explicit_handles_work_outside_the_runtime() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let driver = TokioDriver::with_handle(runtime.handle().clone());
        let (tx, rx) = oneshot::channel();
        spawn_driven(&driver, async { Err(Error::new("late")) }, move |outcome| {
            let _ = tx.send(outcome.map_err(|e| e.message().to_owned()));
        });
        assert_eq!(runtime.block_on(rx).unwrap(), Err("late".to_owned()));
    }
}
