//! Shared FIFO frontier of pending `(url, depth)` work items
//!
//! Besides the plain queue operations, the frontier keeps the count of tasks
//! currently in flight. Pops that start a task (`checkout`) and the end of a
//! task (`checkin`) update that count under the same lock that guards pushes,
//! so "queue empty and nothing in flight" can be observed atomically. Every
//! push happens from inside an in-flight task (or before workers start), which
//! makes that observation final: no work can ever appear afterwards.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A URL waiting to be fetched, with its distance from the seed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    pub depth: u32,
}

impl FrontierEntry {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<FrontierEntry>,
    in_flight: usize,
    closed: bool,
}

/// Thread-safe, unbounded FIFO queue shared by all workers
#[derive(Debug, Default)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    available: Condvar,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueues an entry without blocking beyond the queue lock
    pub fn push(&self, entry: FrontierEntry) {
        self.lock().queue.push_back(entry);
        self.available.notify_one();
    }

    /// Removes and returns the oldest entry, or `None` if the queue is empty
    pub fn try_pop(&self) -> Option<FrontierEntry> {
        self.lock().queue.pop_front()
    }

    /// Snapshot only: another worker may push right after this returns
    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Pops the oldest entry and counts it as in flight, in one critical section
    ///
    /// Every successful checkout must be matched by exactly one `checkin`.
    pub fn checkout(&self) -> Option<FrontierEntry> {
        let mut state = self.lock();
        let entry = state.queue.pop_front()?;
        state.in_flight += 1;
        Some(entry)
    }

    /// Marks one in-flight task as finished
    ///
    /// Returns `true` if this completion left the frontier quiescent: no
    /// queued entries and no other task in flight.
    pub fn checkin(&self) -> bool {
        let quiescent = {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.in_flight == 0 && state.queue.is_empty()
        };
        if quiescent {
            self.available.notify_all();
        }
        quiescent
    }

    /// Whether the queue is empty and no task is in flight, observed atomically
    pub fn is_quiescent(&self) -> bool {
        let state = self.lock();
        state.in_flight == 0 && state.queue.is_empty()
    }

    /// Number of tasks currently checked out
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Blocks until an entry may be available, the frontier is closed or
    /// becomes quiescent, or `timeout` elapses
    pub fn wait_for_work(&self, timeout: Duration) {
        let state = self.lock();
        let _state = self
            .available
            .wait_timeout_while(state, timeout, |s| {
                s.queue.is_empty() && !s.closed && s.in_flight > 0
            })
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Wakes every waiting worker and makes `wait_for_work` return immediately
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
