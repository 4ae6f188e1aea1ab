use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::types::LifecycleEvent;

/// Errors returned when emitting lifecycle events.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleChannelError {
    /// The receiving side is gone.
    #[error("lifecycle channel is closed")]
    Closed,
    /// The channel buffer is full (non-blocking emit only).
    #[error("lifecycle channel is full")]
    Full,
}

/// Sender half used by a surface lifecycle source.
pub struct LifecycleChannel<S> {
    event_tx: mpsc::Sender<LifecycleEvent<S>>,
}

impl<S> Clone for LifecycleChannel<S> {
    fn clone(&self) -> Self {
        Self {
            event_tx: self.event_tx.clone(),
        }
    }
}

impl<S: Send + 'static> LifecycleChannel<S> {
    /// Create a channel and return it with the receiver to hand to the queue.
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<LifecycleEvent<S>>) {
        let (event_tx, event_rx) = mpsc::channel(buffer.max(1));
        (Self { event_tx }, event_rx)
    }

    /// Emit one event, waiting for buffer space.
    pub async fn emit(&self, event: LifecycleEvent<S>) -> Result<(), LifecycleChannelError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| LifecycleChannelError::Closed)
    }

    /// Emit one event from synchronous callback code.
    pub fn try_emit(&self, event: LifecycleEvent<S>) -> Result<(), LifecycleChannelError> {
        self.event_tx.try_send(event).map_err(|err| match err {
            TrySendError::Full(_) => LifecycleChannelError::Full,
            TrySendError::Closed(_) => LifecycleChannelError::Closed,
        })
    }
}
