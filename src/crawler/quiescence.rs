//! Global stop flag, worker state board and completion signalling
//!
//! The decision that the crawl is quiescent is made against the frontier's
//! in-flight counter (see `Frontier::checkin`). This module records that
//! decision, or an external stop request, exactly once, and lets any number of
//! threads wait for it.

use crate::crawler::frontier::Frontier;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Why the crawl stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No queued entries and no task in flight: no further work can appear
    Quiescent,
    /// `stop()` was called before the crawl ran out of work
    Requested,
}

/// Lifecycle of the worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Created, no worker spawned yet
    Idle,
    /// Workers are draining the frontier
    Active,
    /// Stop has been decided; workers are finishing their current task
    Draining,
    /// Every worker has been joined
    Stopped,
}

/// Per-worker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Processing a task or about to poll for one
    Running,
    /// Last poll found the frontier empty
    Idle,
    /// Exited its loop
    Stopped,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Running,
            1 => Self::Idle,
            _ => Self::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Running => 0,
            Self::Idle => 1,
            Self::Stopped => 2,
        }
    }
}

/// Lock-free board of worker states plus the active-worker counter
#[derive(Debug)]
pub struct WorkerBoard {
    states: Vec<AtomicU8>,
    active: AtomicUsize,
}

impl WorkerBoard {
    /// All workers start out `Running`
    pub fn new(workers: usize) -> Self {
        Self {
            states: (0..workers)
                .map(|_| AtomicU8::new(WorkerState::Running.as_u8()))
                .collect(),
            active: AtomicUsize::new(workers),
        }
    }

    pub fn set(&self, worker_id: usize, state: WorkerState) {
        let Some(slot) = self.states.get(worker_id) else {
            return;
        };
        let previous = WorkerState::from_u8(slot.swap(state.as_u8(), Ordering::SeqCst));
        match (previous == WorkerState::Running, state == WorkerState::Running) {
            (true, false) => {
                self.active.fetch_sub(1, Ordering::SeqCst);
            }
            (false, true) => {
                self.active.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        }
    }

    pub fn get(&self, worker_id: usize) -> Option<WorkerState> {
        self.states
            .get(worker_id)
            .map(|slot| WorkerState::from_u8(slot.load(Ordering::SeqCst)))
    }

    pub fn snapshot(&self) -> Vec<WorkerState> {
        self.states
            .iter()
            .map(|slot| WorkerState::from_u8(slot.load(Ordering::SeqCst)))
            .collect()
    }

    /// Number of workers currently `Running`
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Records the stop decision and wakes everyone waiting for it
#[derive(Debug, Default)]
pub struct QuiescenceDetector {
    stop: AtomicBool,
    reason: Mutex<Option<StopReason>>,
    decided: Condvar,
}

impl QuiescenceDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Polled by every worker once per loop iteration
    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Sets the stop flag; the first reason declared wins
    ///
    /// # Returns
    ///
    /// `true` if this call made the decision.
    pub fn declare(&self, reason: StopReason) -> bool {
        let mut current = self.reason.lock().unwrap_or_else(PoisonError::into_inner);
        if current.is_some() {
            return false;
        }
        *current = Some(reason);
        self.stop.store(true, Ordering::SeqCst);
        self.decided.notify_all();
        true
    }

    pub fn reason(&self) -> Option<StopReason> {
        *self.reason.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until a stop reason has been declared
    pub fn wait(&self) -> StopReason {
        let guard = self.reason.lock().unwrap_or_else(PoisonError::into_inner);
        let guard = self
            .decided
            .wait_while(guard, |reason| reason.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        (*guard).unwrap_or(StopReason::Requested)
    }

    /// Like `wait`, giving up after `timeout`
    pub fn wait_timeout(&self, timeout: Duration) -> Option<StopReason> {
        let guard = self.reason.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .decided
            .wait_timeout_while(guard, timeout, |reason| reason.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// Cloneable handle that forces a running crawl to stop
///
/// Safe to call from any thread, e.g. a signal handler thread. Workers notice
/// the request between tasks; an in-flight fetch is not interrupted.
#[derive(Debug, Clone)]
pub struct StopHandle {
    detector: Arc<QuiescenceDetector>,
    frontier: Arc<Frontier>,
}

impl StopHandle {
    pub(crate) fn new(detector: Arc<QuiescenceDetector>, frontier: Arc<Frontier>) -> Self {
        Self { detector, frontier }
    }

    pub fn stop(&self) {
        if self.detector.declare(StopReason::Requested) {
            tracing::info!("Stop requested");
        }
        self.frontier.close();
    }

    pub fn is_stopped(&self) -> bool {
        self.detector.should_stop()
    }
}
