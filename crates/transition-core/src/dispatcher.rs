use std::fmt;

use tokio::{runtime::Handle, sync::mpsc, task::JoinHandle};
use tracing::debug;

use crate::error::DispatchError;

/// Unit of work scheduled on the execution context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Single logical execution context that runs jobs in submission order.
///
/// Implementations must run jobs one at a time and never reorder them. A job
/// the implementation cannot run must be dropped rather than leaked.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, job: Job) -> Result<(), DispatchError>;
}

/// Dispatcher backed by one tokio task draining an unbounded job channel.
#[derive(Clone)]
pub struct SerialDispatcher {
    job_tx: mpsc::UnboundedSender<Job>,
}

impl SerialDispatcher {
    /// Spawn the worker task on `runtime` and return the dispatcher handle.
    ///
    /// The task exits once every dispatcher clone is dropped.
    pub fn spawn(runtime: &Handle) -> (Self, JoinHandle<()>) {
        let (job_tx, mut job_rx) = mpsc::unbounded_channel::<Job>();
        let task = runtime.spawn(async move {
            debug!("serial dispatcher started");
            while let Some(job) = job_rx.recv().await {
                job();
            }
            debug!("serial dispatcher exiting");
        });

        (Self { job_tx }, task)
    }

    pub fn is_closed(&self) -> bool {
        self.job_tx.is_closed()
    }
}

impl fmt::Debug for SerialDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialDispatcher")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Dispatcher for SerialDispatcher {
    fn dispatch(&self, job: Job) -> Result<(), DispatchError> {
        self.job_tx.send(job).map_err(|_| DispatchError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use tokio::{sync::oneshot, time::timeout};

    use super::*;

    #[tokio::test]
    async fn runs_jobs_in_dispatch_order() {
        let (dispatcher, _task) = SerialDispatcher::spawn(&Handle::current());
        let seen = Arc::new(Mutex::new(Vec::new()));

        for idx in 0..16 {
            let seen = Arc::clone(&seen);
            dispatcher
                .dispatch(Box::new(move || seen.lock().expect("seen lock").push(idx)))
                .expect("dispatch should work");
        }

        let (done_tx, done_rx) = oneshot::channel();
        dispatcher
            .dispatch(Box::new(move || {
                let _ = done_tx.send(());
            }))
            .expect("dispatch should work");
        timeout(Duration::from_secs(2), done_rx)
            .await
            .expect("jobs should finish")
            .expect("done signal");

        assert_eq!(*seen.lock().expect("seen lock"), (0..16).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn reports_closed_after_worker_stops() {
        let (dispatcher, task) = SerialDispatcher::spawn(&Handle::current());
        task.abort();
        let _ = task.await;

        assert!(dispatcher.is_closed());
        let err = dispatcher
            .dispatch(Box::new(|| {}))
            .expect_err("closed dispatcher must reject jobs");
        assert_eq!(err, DispatchError::Closed);
    }
}
