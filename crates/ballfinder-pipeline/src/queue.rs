//! Bounded FIFO with drop-oldest backpressure.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Default capacity of both pipeline queues.
pub const DEFAULT_CAPACITY: usize = 4;

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// What became of a pushed item.
#[derive(Debug, PartialEq, Eq)]
pub enum Pushed<T> {
    Queued,
    /// Queued after evicting this, the oldest entry.
    Evicted(T),
    /// The queue was closed; the item is handed back untouched.
    Rejected(T),
}

impl<T> Pushed<T> {
    /// The item that did not end up in the queue, if any.
    pub fn into_lost(self) -> Option<T> {
        match self {
            Pushed::Queued => None,
            Pushed::Evicted(item) | Pushed::Rejected(item) => Some(item),
        }
    }
}

/// Bounded queue that never blocks producers.
///
/// When full, `push` evicts the oldest entry before appending. `pop` blocks
/// until an entry is available or the queue has been closed and drained.
/// Items move in and out by value; the queue owns them while buffered.
pub struct DropOldestQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
    capacity: usize,
    dropped: AtomicU64,
}

impl<T> DropOldestQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            available: Condvar::new(),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `item`, evicting the oldest entry when full.
    ///
    /// A closed queue accepts nothing new; entries buffered before the close
    /// can still be drained.
    pub fn push(&self, item: T) -> Pushed<T> {
        let outcome = {
            let mut state = self.lock();
            if state.closed {
                return Pushed::Rejected(item);
            }
            let evicted = if state.items.len() >= self.capacity {
                state.items.pop_front()
            } else {
                None
            };
            state.items.push_back(item);
            evicted.map_or(Pushed::Queued, Pushed::Evicted)
        };
        if matches!(outcome, Pushed::Evicted(_)) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.available.notify_one();
        outcome
    }

    /// Remove the oldest entry, blocking while the queue is empty.
    ///
    /// Returns `None` once the queue is closed and empty.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Non-blocking variant of [`pop`](Self::pop).
    pub fn try_pop(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    /// Wake every waiter; blocked and future `pop` calls return `None` once
    /// the buffered entries are gone.
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Discard every buffered entry, returning how many were removed.
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let n = state.items.len();
        state.items.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries evicted by overflow since construction.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
