use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam::channel::{bounded, select, Receiver, Sender};

/// Shared cancellation flag for one pipeline run.
///
/// Besides the flag, the token owns a channel whose only sender is dropped
/// on cancellation. Its receiver therefore becomes permanently ready, which
/// lets a stage blocked in `select!` on a handoff notice the cancellation
/// without polling.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

struct Inner {
    cancelled: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (trigger, signal) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                signal,
            }),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner
            .trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Receiver that becomes ready (disconnected) once cancelled.
    pub(crate) fn signal(&self) -> &Receiver<()> {
        &self.inner.signal
    }

    /// Hand `item` to `tx`, blocking until the receiver takes it.
    ///
    /// Returns false when the run was cancelled or the receiver is gone, in
    /// which case the caller should stop producing.
    pub(crate) fn send<T>(&self, tx: &Sender<T>, item: T) -> bool {
        if self.is_cancelled() {
            return false;
        }
        select! {
            send(tx, item) -> res => res.is_ok(),
            recv(self.signal()) -> _ => false,
        }
    }

    /// Take the next item from `rx`, or `None` once the producer is done or
    /// the run was cancelled.
    pub(crate) fn recv<T>(&self, rx: &Receiver<T>) -> Option<T> {
        if self.is_cancelled() {
            return None;
        }
        select! {
            recv(rx) -> msg => msg.ok(),
            recv(self.signal()) -> _ => None,
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
