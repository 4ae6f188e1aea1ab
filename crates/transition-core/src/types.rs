use serde::{Deserialize, Serialize};

/// Default number of successful transitions kept for diagnostics.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Construction-time tuning for a [`crate::TransitionQueue`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum number of entries retained by the history ring (`>= 1`).
    pub history_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// One successfully executed transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransitionRecord {
    /// Diagnostic label of the action.
    pub label: String,
    /// Completion time in milliseconds since Unix epoch.
    pub completed_at_ms: u64,
}

/// Point-in-time view of the queue for introspection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueStatus {
    /// Actions waiting in the backlog (excludes one currently running).
    pub pending: usize,
    /// Whether a drain loop currently owns the backlog.
    pub draining: bool,
    /// Whether a foreground surface is recorded.
    pub surface_available: bool,
}

/// Foreground lifecycle notifications emitted by a surface lifecycle source.
///
/// Only `Resumed` and `Paused` change surface availability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent<S> {
    Created,
    Started,
    /// The surface became the current foreground surface.
    Resumed(S),
    /// The current foreground surface lost focus.
    Paused,
    Stopped,
    Destroyed,
}

impl<S> LifecycleEvent<S> {
    /// Stable name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Started => "started",
            Self::Resumed(_) => "resumed",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Destroyed => "destroyed",
        }
    }
}
