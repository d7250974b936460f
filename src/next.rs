//! The continuation handed to callback handlers.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::warn;

use crate::error::Error;

/// Continues the middleware chain.
///
/// `call()` moves on to the next matching layer, `fail(err)` skips ahead to
/// the next error handler. A `Next` may be cloned freely (e.g. into a spawned
/// task) but only the first call across all clones takes effect. Dropping every
/// clone without calling either ends the chain for the request.
#[derive(Clone)]
pub struct Next {
    slot: Arc<Mutex<Option<oneshot::Sender<Option<Error>>>>>,
}

/// What a dispatched layer asked for.
pub(crate) type Signal = oneshot::Receiver<Option<Error>>;

impl Next {
    pub(crate) fn channel() -> (Self, Signal) {
        let (tx, rx) = oneshot::channel();
        (Self { slot: Arc::new(Mutex::new(Some(tx))) }, rx)
    }

    /// Continues with the next matching handler.
    pub fn call(&self) {
        self.deliver(None);
    }

    /// Forwards `err` to the error-handling chain.
    pub fn fail(&self, err: impl Into<Error>) {
        self.deliver(Some(err.into()));
    }

    /// Whether `call` or `fail` has already been used on any clone.
    pub fn is_spent(&self) -> bool {
        self.slot.lock().is_none()
    }

    fn deliver(&self, outcome: Option<Error>) {
        let Some(tx) = self.slot.lock().take() else {
            match outcome {
                Some(err) => warn!(error = %err, "next called twice, dropping error"),
                None => warn!("next called twice, ignoring"),
            }
            return;
        };
        // The dispatcher only stops listening once the request is torn down.
        let _ = tx.send(outcome);
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").field("spent", &self.is_spent()).finish()
    }
}
