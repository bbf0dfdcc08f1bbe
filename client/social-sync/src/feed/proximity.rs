//! "Approaching the end of the visible list" signal source
//!
//! The presentation layer sends a `ProximitySignal` whenever the last visible
//! item comes close to the viewport. A feed keeps at most one listener task;
//! installing a new one aborts the previous one first.

use crate::domain::PostId;
use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Default buffer for proximity channels
pub const DEFAULT_SIGNAL_BUFFER: usize = 8;

/// The item named here is the one the viewer is approaching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProximitySignal {
    pub last_visible: PostId,
}

impl ProximitySignal {
    pub fn new(last_visible: PostId) -> Self {
        Self { last_visible }
    }
}

pub type ProximitySender = mpsc::Sender<ProximitySignal>;
pub type ProximityReceiver = mpsc::Receiver<ProximitySignal>;

pub fn proximity_channel(buffer: usize) -> (ProximitySender, ProximityReceiver) {
    mpsc::channel(buffer.max(1))
}

/// Holds the single active listener task
#[derive(Default)]
pub(crate) struct ObserverSlot {
    active: Mutex<Option<JoinHandle<()>>>,
}

impl ObserverSlot {
    /// Install a listener, releasing any prior one first.
    ///
    /// `on_signal` returns `None` once its owner is gone, which ends the task.
    /// The task runs on the current Tokio runtime; outside of one nothing is
    /// installed and any prior listener keeps running.
    pub(crate) fn install<F>(
        &self,
        mut signals: ProximityReceiver,
        on_signal: F,
    ) -> SyncResult<()>
    where
        F: Fn(ProximitySignal) -> Option<bool> + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|e| SyncError::Runtime(e.to_string()))?;

        let mut active = self.active.lock();
        if let Some(prior) = active.take() {
            debug!("Releasing prior proximity observer");
            prior.abort();
        }

        *active = Some(runtime.spawn(async move {
            while let Some(signal) = signals.recv().await {
                if on_signal(signal).is_none() {
                    break;
                }
            }
        }));
        Ok(())
    }

    pub(crate) fn release(&self) -> bool {
        match self.active.lock().take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for ObserverSlot {
    fn drop(&mut self) {
        if let Some(handle) = self.active.get_mut().take() {
            handle.abort();
        }
    }
}
