//! Short-lived store for values handed from one screen to the next.

use std::{
    any::Any,
    sync::{Arc, RwLock},
};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandoffError {
    #[error("handoff container lock poisoned")]
    Poisoned,
}

type ExpiryFn = Box<dyn Fn() -> bool + Send + Sync>;

struct Entry {
    expired: ExpiryFn,
    value: Arc<dyn Any + Send + Sync>,
}

/// Values parked between transitions, each dropped once its expiry
/// predicate reports true.
#[derive(Clone, Default)]
pub struct HandoffContainer {
    entries: Arc<RwLock<Vec<Entry>>>,
}

impl HandoffContainer {
    /// Park `value` until `expired_when` returns true.
    pub fn insert<T, F>(&self, expired_when: F, value: T) -> Result<(), HandoffError>
    where
        T: Any + Send + Sync,
        F: Fn() -> bool + Send + Sync + 'static,
    {
        let mut entries = self.entries.write().map_err(|_| HandoffError::Poisoned)?;
        entries.push(Entry {
            expired: Box::new(expired_when),
            value: Arc::new(value),
        });
        Ok(())
    }

    /// Drop expired entries and return how many were removed.
    pub fn clean_up(&self) -> Result<usize, HandoffError> {
        let mut entries = self.entries.write().map_err(|_| HandoffError::Poisoned)?;
        let before = entries.len();
        entries.retain(|entry| !(entry.expired)());
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, remaining = entries.len(), "expired handoff entries");
        }
        Ok(removed)
    }

    /// Live values of type `E`, in insertion order. Expired entries are
    /// dropped first.
    pub fn search<E>(&self) -> Result<Vec<Arc<E>>, HandoffError>
    where
        E: Any + Send + Sync,
    {
        self.clean_up()?;
        let entries = self.entries.read().map_err(|_| HandoffError::Poisoned)?;
        Ok(entries
            .iter()
            .filter_map(|entry| Arc::clone(&entry.value).downcast::<E>().ok())
            .collect())
    }

    pub fn len(&self) -> Result<usize, HandoffError> {
        Ok(self
            .entries
            .read()
            .map_err(|_| HandoffError::Poisoned)?
            .len())
    }

    pub fn is_empty(&self) -> Result<bool, HandoffError> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[derive(Debug, PartialEq)]
    struct ProfileDraft {
        name: String,
    }

    #[derive(Debug, PartialEq)]
    struct CartSnapshot(u32);

    #[test]
    fn filters_values_by_type() {
        let container = HandoffContainer::default();
        container
            .insert(
                || false,
                ProfileDraft {
                    name: "alice".into(),
                },
            )
            .expect("insert draft");
        container
            .insert(|| false, CartSnapshot(3))
            .expect("insert cart");

        let drafts = container.search::<ProfileDraft>().expect("search drafts");
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].name, "alice");

        let carts = container.search::<CartSnapshot>().expect("search carts");
        assert_eq!(*carts[0], CartSnapshot(3));
    }

    #[test]
    fn drops_entries_once_expired() {
        let container = HandoffContainer::default();
        let screen_closed = Arc::new(AtomicBool::new(false));
        {
            let screen_closed = Arc::clone(&screen_closed);
            container
                .insert(move || screen_closed.load(Ordering::SeqCst), CartSnapshot(1))
                .expect("insert cart");
        }
        container
            .insert(|| false, CartSnapshot(2))
            .expect("insert cart");

        assert_eq!(container.clean_up().expect("clean up"), 0);
        screen_closed.store(true, Ordering::SeqCst);

        let carts = container.search::<CartSnapshot>().expect("search carts");
        assert_eq!(carts.len(), 1);
        assert_eq!(*carts[0], CartSnapshot(2));
        assert_eq!(container.len().expect("len"), 1);
    }

    #[test]
    fn clones_share_entries() {
        let a = HandoffContainer::default();
        let b = a.clone();
        a.insert(|| false, CartSnapshot(9)).expect("insert");

        assert!(!b.is_empty().expect("is_empty"));
        assert_eq!(*b.search::<CartSnapshot>().expect("search")[0], CartSnapshot(9));
    }
}
