//! Tracks in-flight remote calls so the UI can show progress and callers
//! can wait for other calls to settle.

use std::{
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::watch;
use tracing::{debug, warn};

/// In-flight call bookkeeping.
pub trait ConnectingApiStatus: Send + Sync {
    /// Mark a call named `name` as started.
    fn start_api(&self, name: &str);

    /// Mark one call named `name` as finished.
    fn finish_api(&self, name: &str);

    /// Receiver that observes the number of in-flight calls.
    fn connecting_count(&self) -> watch::Receiver<usize>;
}

/// In-memory [`ConnectingApiStatus`] keeping the names of in-flight calls.
///
/// The same name may be in flight several times; finishing removes one
/// occurrence.
#[derive(Clone)]
pub struct TrackedApiStatus {
    calls: Arc<Mutex<Vec<String>>>,
    count_tx: Arc<watch::Sender<usize>>,
}

impl Default for TrackedApiStatus {
    fn default() -> Self {
        let (count_tx, _) = watch::channel(0);
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            count_tx: Arc::new(count_tx),
        }
    }
}

impl TrackedApiStatus {
    /// Names of calls currently in flight, in start order.
    pub fn in_flight(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ConnectingApiStatus for TrackedApiStatus {
    fn start_api(&self, name: &str) {
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        calls.push(name.to_owned());
        self.count_tx.send_replace(calls.len());
        debug!(call = name, connecting = calls.len(), "api call started");
    }

    fn finish_api(&self, name: &str) {
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        match calls.iter().position(|call| call == name) {
            Some(idx) => {
                calls.remove(idx);
            }
            None => warn!(call = name, "finish reported for a call that was not started"),
        }
        self.count_tx.send_replace(calls.len());
        debug!(call = name, connecting = calls.len(), "api call finished");
    }

    fn connecting_count(&self) -> watch::Receiver<usize> {
        self.count_tx.subscribe()
    }
}

/// Run `call` while it is counted as in flight under `name`.
///
/// The call is marked finished whether it succeeds or fails.
pub async fn track_call<T, Fut>(status: &dyn ConnectingApiStatus, name: &str, call: Fut) -> T
where
    Fut: Future<Output = T>,
{
    status.start_api(name);
    let output = call.await;
    status.finish_api(name);
    output
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::{sync::oneshot, time::timeout};

    use super::*;

    #[test]
    fn counts_duplicate_names_separately() {
        let status = TrackedApiStatus::default();
        let count = status.connecting_count();

        status.start_api("fetch_profile");
        status.start_api("fetch_profile");
        status.start_api("fetch_feed");
        assert_eq!(*count.borrow(), 3);

        status.finish_api("fetch_profile");
        assert_eq!(*count.borrow(), 2);
        assert_eq!(status.in_flight(), vec!["fetch_profile", "fetch_feed"]);
    }

    #[test]
    fn ignores_unknown_finish() {
        let status = TrackedApiStatus::default();
        status.start_api("fetch_feed");
        status.finish_api("never_started");

        assert_eq!(*status.connecting_count().borrow(), 1);
    }

    #[tokio::test]
    async fn track_call_counts_while_pending_and_releases_on_error() {
        let status = TrackedApiStatus::default();
        let mut count = status.connecting_count();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let tracked = {
            let status = status.clone();
            tokio::spawn(async move {
                track_call(&status, "login", async move {
                    let _ = release_rx.await;
                    Err::<(), &str>("unauthorized")
                })
                .await
            })
        };

        timeout(Duration::from_secs(2), count.wait_for(|n| *n == 1))
            .await
            .expect("call should be counted")
            .expect("status sender alive");

        release_tx.send(()).expect("release call");
        let result = tracked.await.expect("tracked task");
        assert_eq!(result, Err("unauthorized"));
        assert_eq!(*status.connecting_count().borrow(), 0);
    }
}
