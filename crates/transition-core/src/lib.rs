//! Serialized foreground-surface transition queue.
//!
//! Background work hands UI transitions to a [`TransitionQueue`]; the queue
//! runs them one at a time, in submission order, on a single execution
//! context, and only while a foreground surface is available.

/// Transition action wrapper and invocation.
pub mod action;
/// Execution-context abstraction and the tokio-backed serial dispatcher.
pub mod dispatcher;
/// Action error taxonomy and failure classification.
pub mod error;
/// Bounded history of successful transitions.
pub mod history;
/// Lifecycle event channel used by surface lifecycle sources.
pub mod lifecycle;
/// The transition queue itself.
pub mod queue;
/// Config, status and record types.
pub mod types;

pub use action::TransitionAction;
pub use dispatcher::{Dispatcher, Job, SerialDispatcher};
pub use error::{
    AlwaysTerminal, DispatchError, ErrorClassifier, FailureClass, TransitionError,
    TransitionErrorCategory,
};
pub use history::{HistoryRing, HistoryView};
pub use lifecycle::{LifecycleChannel, LifecycleChannelError};
pub use queue::TransitionQueue;
pub use types::{
    DEFAULT_HISTORY_CAPACITY, LifecycleEvent, QueueConfig, QueueStatus, TransitionRecord,
};
