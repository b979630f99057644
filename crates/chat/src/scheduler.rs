use std::time::Duration;

use snafu::ResultExt;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::error::{ChatResult, NoRuntimeSnafu};

pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Deferred-callback primitive. Callbacks run once after `delay` unless the
/// returned handle is cancelled or dropped first.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, callback: Callback) -> ScheduledHandle;
}

/// Cancellation handle for one scheduled callback. Dropping it cancels.
#[derive(Debug)]
pub struct ScheduledHandle {
    cancel_tx: Option<oneshot::Sender<()>>,
    cancelled: bool,
}

impl ScheduledHandle {
    pub fn new(cancel_tx: oneshot::Sender<()>) -> Self {
        Self {
            cancel_tx: Some(cancel_tx),
            cancelled: false,
        }
    }

    /// Returns `true` only when this call stopped a callback that had not run yet.
    /// Safe to call any number of times.
    pub fn cancel(&mut self) -> bool {
        let Some(cancel_tx) = self.cancel_tx.take() else {
            return false;
        };
        self.cancelled = cancel_tx.send(()).is_ok();
        self.cancelled
    }

    /// Whether [`cancel`](Self::cancel) stopped the callback before it ran.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl Drop for ScheduledHandle {
    fn drop(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(());
        }
    }
}

/// Runs each callback on a tokio task that races a sleep against cancellation.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Binds to the runtime the caller is running on.
    pub fn current() -> ChatResult<Self> {
        let handle = Handle::try_current().context(NoRuntimeSnafu {
            stage: "scheduler-current-runtime",
        })?;
        Ok(Self::new(handle))
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, callback: Callback) -> ScheduledHandle {
        let (cancel_tx, mut cancel_rx) = oneshot::channel();

        self.handle.spawn(async move {
            tokio::select! {
                // A dropped handle closes the channel, which also lands here.
                _ = &mut cancel_rx => {
                    let delay_ms = delay.as_millis() as u64;
                    tracing::debug!(delay_ms, "scheduled callback cancelled");
                }
                _ = tokio::time::sleep(delay) => callback(),
            }
        });

        ScheduledHandle::new(cancel_tx)
    }
}
