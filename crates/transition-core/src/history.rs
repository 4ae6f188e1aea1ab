use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::types::TransitionRecord;

/// Bounded record of recently succeeded transitions, oldest evicted first.
#[derive(Debug, Clone)]
pub struct HistoryRing {
    entries: VecDeque<TransitionRecord>,
    capacity: usize,
}

impl HistoryRing {
    /// Create a ring with a fixed capacity (`capacity >= 1`).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a record, evicting the oldest entry once the ring is full.
    pub fn push(&mut self, record: TransitionRecord) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(record);
    }

    /// Record a completion for `label` stamped with the current wall clock.
    pub fn record_now(&mut self, label: impl Into<String>) {
        self.push(TransitionRecord {
            label: label.into(),
            completed_at_ms: now_ms(),
        });
    }

    /// Copy of the current entries, oldest first.
    pub fn snapshot(&self) -> Vec<TransitionRecord> {
        self.entries.iter().cloned().collect()
    }
}

/// Read-only handle onto a shared history ring.
///
/// Handed to actions submitted with history so they can consult recent
/// transitions without touching queue internals.
#[derive(Debug, Clone)]
pub struct HistoryView {
    ring: Arc<Mutex<HistoryRing>>,
}

impl HistoryView {
    pub(crate) fn new(ring: Arc<Mutex<HistoryRing>>) -> Self {
        Self { ring }
    }

    /// Snapshot of the ring, oldest first.
    pub fn snapshot(&self) -> Vec<TransitionRecord> {
        self.ring
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    /// Labels only, oldest first.
    pub fn labels(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .map(|record| record.label)
            .collect()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis().min(u128::from(u64::MAX)) as u64)
        .unwrap_or(0)
}
