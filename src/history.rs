//! Bounded FIFO of recently created structured errors.

use crate::core_types::StructuredError;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Default number of retained errors.
pub const DEFAULT_HISTORY_SIZE: usize = 50;

/// Largest bound accepted by configuration validation.
pub const MAX_HISTORY_SIZE: usize = 10_000;

/// Append-only, capacity-bounded error history.
///
/// Oldest entries are evicted first. Appends are serialized through a mutex,
/// so append order equals call order even when errors are created from
/// several tasks.
#[derive(Debug)]
pub struct ErrorHistory {
    inner: Mutex<HistoryInner>,
}

#[derive(Debug)]
struct HistoryInner {
    entries: VecDeque<StructuredError>,
    capacity: usize,
}

impl HistoryInner {
    fn trim(&mut self) {
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }
}

impl Default for ErrorHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_SIZE)
    }
}

impl ErrorHistory {
    /// History bounded to `capacity` entries. Storage grows on demand.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(HistoryInner {
                entries: VecDeque::new(),
                capacity,
            }),
        }
    }

    pub fn record(&self, error: StructuredError) {
        let mut inner = self.inner.lock();
        inner.entries.push_back(error);
        inner.trim();
    }

    /// Snapshot in insertion order, oldest first.
    pub fn snapshot(&self) -> Vec<StructuredError> {
        self.inner.lock().entries.iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Change the bound, evicting the oldest entries if it shrank.
    pub fn set_capacity(&self, capacity: usize) {
        let mut inner = self.inner.lock();
        inner.capacity = capacity;
        inner.trim();
    }
}
