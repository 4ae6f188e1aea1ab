use std::{
    any::type_name,
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
};

use tracing::error;

use crate::error::TransitionError;

type RunFn<S> = Box<dyn FnMut(&S) -> Result<(), TransitionError> + Send + 'static>;

/// Caller-supplied unit of work that performs a transition against a surface.
///
/// The label is diagnostic only; two actions with the same label are still
/// distinct. The closure is `FnMut` because a suspended action is invoked
/// again once a surface is back.
pub struct TransitionAction<S> {
    label: String,
    run: RunFn<S>,
}

/// Result of one invocation attempt.
#[derive(Debug)]
pub(crate) enum InvokeOutcome {
    Completed,
    Failed(TransitionError),
    Panicked,
}

impl<S> TransitionAction<S> {
    pub fn new<F>(label: impl Into<String>, run: F) -> Self
    where
        F: FnMut(&S) -> Result<(), TransitionError> + Send + 'static,
    {
        Self {
            label: label.into(),
            run: Box::new(run),
        }
    }

    /// Build an action labelled with the closure's type name.
    pub fn from_fn<F>(run: F) -> Self
    where
        F: FnMut(&S) -> Result<(), TransitionError> + Send + 'static,
    {
        Self::new(type_name::<F>(), run)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn invoke(&mut self, surface: &S) -> InvokeOutcome {
        match catch_unwind(AssertUnwindSafe(|| (self.run)(surface))) {
            Ok(Ok(())) => InvokeOutcome::Completed,
            Ok(Err(err)) => InvokeOutcome::Failed(err),
            Err(_) => {
                error!(
                    label = %self.label,
                    error = %TransitionError::panicked(&self.label),
                    "transition action panicked"
                );
                InvokeOutcome::Panicked
            }
        }
    }
}

impl<S> fmt::Debug for TransitionAction<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransitionErrorCategory;

    #[test]
    fn derives_label_from_closure_type() {
        let action = TransitionAction::<u32>::from_fn(|_surface: &u32| Ok(()));
        assert!(action.label().contains("action::tests"));
    }

    #[test]
    fn reports_completion_and_failure() {
        let mut calls = 0;
        let mut action = TransitionAction::new("flaky", move |surface: &u32| {
            calls += 1;
            if calls == 1 {
                Err(TransitionError::new(
                    TransitionErrorCategory::Rejected,
                    "not_ready",
                    format!("surface {surface} not ready"),
                ))
            } else {
                Ok(())
            }
        });

        match action.invoke(&7) {
            InvokeOutcome::Failed(err) => assert_eq!(err.code, "not_ready"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(matches!(action.invoke(&7), InvokeOutcome::Completed));
    }

    #[test]
    fn contains_panics() {
        let mut action = TransitionAction::new("boom", |_surface: &u32| -> Result<(), TransitionError> {
            panic!("surface exploded")
        });
        assert!(matches!(action.invoke(&1), InvokeOutcome::Panicked));
    }
}
