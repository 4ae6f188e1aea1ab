use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad category attached to an action failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransitionErrorCategory {
    /// The surface went away while the action was running.
    SurfaceDetached,
    /// The surface refused the transition (wrong screen, stale state).
    Rejected,
    /// Bug or invariant break inside the action itself.
    Internal,
}

/// Error returned by a transition action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{category:?}:{code}: {message}")]
pub struct TransitionError {
    /// High-level error category.
    pub category: TransitionErrorCategory,
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl TransitionError {
    /// Construct a new transition error.
    pub fn new(
        category: TransitionErrorCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Standard error for an action whose surface disappeared mid-run.
    pub fn surface_detached(message: impl Into<String>) -> Self {
        Self::new(
            TransitionErrorCategory::SurfaceDetached,
            "surface_detached",
            message,
        )
    }

    /// Error recorded for an action that panicked.
    pub(crate) fn panicked(label: &str) -> Self {
        Self::new(
            TransitionErrorCategory::Internal,
            "action_panicked",
            format!("transition action '{label}' panicked"),
        )
    }
}

/// How the queue treats a failed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Put the action back at the head of the backlog and stop draining.
    Suspending,
    /// Drop the action and keep draining.
    Terminal,
}

/// Decides whether an action failure is retried later or dropped.
///
/// A classifier that panics is treated as returning [`FailureClass::Terminal`].
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, error: &TransitionError) -> FailureClass;
}

impl<F> ErrorClassifier for F
where
    F: Fn(&TransitionError) -> FailureClass + Send + Sync,
{
    fn classify(&self, error: &TransitionError) -> FailureClass {
        self(error)
    }
}

/// Classifier used when none is supplied: every failure is terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysTerminal;

impl ErrorClassifier for AlwaysTerminal {
    fn classify(&self, _error: &TransitionError) -> FailureClass {
        FailureClass::Terminal
    }
}

/// Errors returned by the execution context.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The execution context stopped accepting work.
    #[error("execution context is closed")]
    Closed,
}
