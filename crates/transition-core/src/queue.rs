//! Serialized transition queue bound to the current foreground surface.

use std::{
    collections::VecDeque,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::{
    action::{InvokeOutcome, TransitionAction},
    dispatcher::Dispatcher,
    error::{AlwaysTerminal, ErrorClassifier, FailureClass, TransitionError},
    history::{HistoryRing, HistoryView},
    types::{LifecycleEvent, QueueConfig, QueueStatus, TransitionRecord},
};

/// Runs transition actions one at a time, in submission order, against
/// whichever surface is current when each action gets its turn.
///
/// Cloning yields another handle onto the same queue. Submitting never blocks
/// and never fails; an action waits at the head of the backlog while no
/// surface is available and is retried on the next surface or submit signal.
pub struct TransitionQueue<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for TransitionQueue<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<S> {
    backlog: Mutex<VecDeque<TransitionAction<S>>>,
    // Single-flight guard: set while a drain loop owns the backlog head.
    draining: AtomicBool,
    surface: Mutex<Option<S>>,
    // Bumped on every surface signal so a run can tell it missed one.
    surface_generation: AtomicU64,
    history: Arc<Mutex<HistoryRing>>,
    dispatcher: Box<dyn Dispatcher>,
    classifier: Box<dyn ErrorClassifier>,
}

impl<S> TransitionQueue<S>
where
    S: Clone + Send + 'static,
{
    /// Create a queue whose failures are all treated as terminal.
    pub fn new(config: QueueConfig, dispatcher: impl Dispatcher + 'static) -> Self {
        Self::with_classifier(config, dispatcher, AlwaysTerminal)
    }

    /// Create a queue with an explicit failure classifier.
    pub fn with_classifier(
        config: QueueConfig,
        dispatcher: impl Dispatcher + 'static,
        classifier: impl ErrorClassifier + 'static,
    ) -> Self {
        debug!(
            history_capacity = config.history_capacity,
            "creating transition queue"
        );
        Self {
            inner: Arc::new(Inner {
                backlog: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
                surface: Mutex::new(None),
                surface_generation: AtomicU64::new(0),
                history: Arc::new(Mutex::new(HistoryRing::new(config.history_capacity))),
                dispatcher: Box::new(dispatcher),
                classifier: Box::new(classifier),
            }),
        }
    }

    /// Append an action to the backlog and start draining if idle.
    pub fn submit(&self, action: TransitionAction<S>) {
        debug!(label = action.label(), "transition submitted");
        lock(&self.inner.backlog).push_back(action);
        self.inner.drain();
    }

    /// Like [`Self::submit`], but the action also receives a read-only view
    /// of recent transition history.
    pub fn submit_with_history<F>(&self, label: impl Into<String>, mut run: F)
    where
        F: FnMut(&S, &HistoryView) -> Result<(), TransitionError> + Send + 'static,
    {
        let view = self.history_view();
        self.submit(TransitionAction::new(label, move |surface: &S| {
            run(surface, &view)
        }));
    }

    /// Record `surface` as the current foreground surface and resume draining.
    pub fn on_surface_available(&self, surface: S) {
        *lock(&self.inner.surface) = Some(surface);
        self.inner.surface_generation.fetch_add(1, Ordering::SeqCst);
        debug!(
            pending = self.pending(),
            "foreground surface available; resuming transitions"
        );
        self.inner.drain();
    }

    /// Forget the current surface. A running action is not interrupted; the
    /// next one defers.
    pub fn on_surface_unavailable(&self) {
        *lock(&self.inner.surface) = None;
        debug!("foreground surface unavailable");
    }

    /// Apply one lifecycle notification.
    pub fn on_lifecycle_event(&self, event: LifecycleEvent<S>) {
        match event {
            LifecycleEvent::Resumed(surface) => self.on_surface_available(surface),
            LifecycleEvent::Paused => self.on_surface_unavailable(),
            other => debug!(event = other.kind(), "ignoring lifecycle event"),
        }
    }

    /// Spawn a task on the current tokio runtime that applies lifecycle
    /// events in order until the channel closes or `cancel` fires.
    pub fn attach_lifecycle(
        &self,
        mut events: mpsc::Receiver<LifecycleEvent<S>>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let queue = self.clone();
        tokio::spawn(async move {
            debug!("lifecycle listener started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("lifecycle listener cancelled");
                        break;
                    }
                    event = events.recv() => match event {
                        Some(event) => queue.on_lifecycle_event(event),
                        None => {
                            debug!("lifecycle channel closed");
                            break;
                        }
                    },
                }
            }
        })
    }

    /// Recent successful transitions, oldest first.
    pub fn history(&self) -> Vec<TransitionRecord> {
        lock(&self.inner.history).snapshot()
    }

    pub fn history_view(&self) -> HistoryView {
        HistoryView::new(Arc::clone(&self.inner.history))
    }

    /// Number of actions waiting in the backlog.
    pub fn pending(&self) -> usize {
        lock(&self.inner.backlog).len()
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            pending: self.pending(),
            draining: self.inner.draining.load(Ordering::SeqCst),
            surface_available: self.inner.current_surface().is_some(),
        }
    }
}

impl<S> Inner<S>
where
    S: Clone + Send + 'static,
{
    fn drain(self: &Arc<Self>) {
        if self.draining.swap(true, Ordering::SeqCst) {
            return;
        }
        self.schedule_next();
    }

    // Caller must own the guard.
    fn schedule_next(self: &Arc<Self>) {
        let action = {
            let mut backlog = lock(&self.backlog);
            match backlog.pop_front() {
                Some(action) => action,
                None => {
                    // Cleared under the backlog lock so a concurrent submit
                    // either sees the guard free or has its action popped here.
                    self.draining.store(false, Ordering::SeqCst);
                    return;
                }
            }
        };

        let label = action.label().to_owned();
        let run = PendingRun {
            inner: Arc::clone(self),
            action: Some(action),
        };
        debug!(%label, "dispatching transition");
        if let Err(err) = self.dispatcher.dispatch(Box::new(move || run.execute())) {
            warn!(%label, error = %err, "execution context rejected transition; keeping it queued");
        }
    }

    fn run(self: &Arc<Self>, mut action: TransitionAction<S>) {
        let generation = self.surface_generation.load(Ordering::SeqCst);
        let Some(surface) = self.current_surface() else {
            debug!(
                label = action.label(),
                "no foreground surface; deferring transition"
            );
            self.requeue_front(action);
            // A surface may have arrived while the guard was still held, in
            // which case its drain trigger was swallowed.
            if self.current_surface().is_some() {
                self.drain();
            }
            return;
        };

        match action.invoke(&surface) {
            InvokeOutcome::Completed => {
                debug!(label = action.label(), "transition completed");
                lock(&self.history).record_now(action.label());
                self.schedule_next();
            }
            InvokeOutcome::Failed(err) => match self.classify(action.label(), &err) {
                FailureClass::Suspending => {
                    debug!(
                        label = action.label(),
                        error = %err,
                        "transition suspended until the next surface signal"
                    );
                    self.requeue_front(action);
                    // A fresh surface signalled while the action ran; retry
                    // against it instead of waiting for another one.
                    if self.surface_generation.load(Ordering::SeqCst) != generation
                        && self.current_surface().is_some()
                    {
                        self.drain();
                    }
                }
                FailureClass::Terminal => {
                    warn!(label = action.label(), error = %err, "transition failed; dropping it");
                    self.schedule_next();
                }
            },
            InvokeOutcome::Panicked => self.schedule_next(),
        }
    }

    fn classify(&self, label: &str, err: &TransitionError) -> FailureClass {
        catch_unwind(AssertUnwindSafe(|| self.classifier.classify(err))).unwrap_or_else(|_| {
            error!(%label, error = %err, "failure classifier panicked; treating failure as terminal");
            FailureClass::Terminal
        })
    }

    fn requeue_front(&self, action: TransitionAction<S>) {
        let mut backlog = lock(&self.backlog);
        backlog.push_front(action);
        self.draining.store(false, Ordering::SeqCst);
    }

    fn current_surface(&self) -> Option<S> {
        lock(&self.surface).clone()
    }
}

/// A dispatched action. If the execution context drops the job without
/// running it, the action goes back to the head of the backlog.
struct PendingRun<S: Clone + Send + 'static> {
    inner: Arc<Inner<S>>,
    action: Option<TransitionAction<S>>,
}

impl<S: Clone + Send + 'static> PendingRun<S> {
    fn execute(mut self) {
        if let Some(action) = self.action.take() {
            self.inner.run(action);
        }
    }
}

impl<S: Clone + Send + 'static> Drop for PendingRun<S> {
    fn drop(&mut self) {
        if let Some(action) = self.action.take() {
            debug!(
                label = action.label(),
                "dispatched transition dropped unrun; requeueing"
            );
            self.inner.requeue_front(action);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
