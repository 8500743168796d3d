//! Fixed-size pool of worker threads draining the frontier
//!
//! Each worker loops: check the stop flag, check out an entry, run the page
//! task, check it back in. A worker whose checkout comes back empty marks
//! itself idle and either observes quiescence (queue empty, nothing in flight)
//! or sleeps on the frontier until work, quiescence, closing, or the poll
//! interval arrives. Whoever observes quiescence first declares it; everyone
//! else sees the stop flag on their next iteration.

use crate::crawler::frontier::FrontierEntry;
use crate::crawler::quiescence::{StopReason, WorkerState};
use crate::crawler::task::{CrawlContext, PageTask, TaskOutcome};
use crate::output::OutputSink;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Per-worker totals returned when the worker exits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub tasks: u64,
    pub records: u64,
    pub failures: u64,
}

/// Handles of the running workers
pub struct WorkerPool {
    handles: Vec<JoinHandle<WorkerReport>>,
}

impl WorkerPool {
    /// Spawns one named thread per sink
    ///
    /// If any spawn fails, the workers already running are stopped and
    /// joined before the error is returned.
    pub fn spawn(ctx: Arc<CrawlContext>, sinks: Vec<Box<dyn OutputSink>>) -> io::Result<Self> {
        let mut handles = Vec::with_capacity(sinks.len());

        for (worker_id, sink) in sinks.into_iter().enumerate() {
            let worker = Worker {
                id: worker_id,
                ctx: Arc::clone(&ctx),
                sink,
            };
            let spawned = thread::Builder::new()
                .name(format!("crawl-worker-{}", worker_id))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    tracing::error!("Failed to spawn worker {}: {}", worker_id, e);
                    ctx.halt(StopReason::Requested);
                    Self { handles }.join();
                    return Err(e);
                }
            }
        }

        tracing::info!("Started {} workers", handles.len());
        Ok(Self { handles })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every worker to exit
    ///
    /// A worker that panicked contributes an empty report.
    pub fn join(self) -> Vec<WorkerReport> {
        self.handles
            .into_iter()
            .enumerate()
            .map(|(worker_id, handle)| {
                handle.join().unwrap_or_else(|_| {
                    tracing::error!("Worker {} panicked", worker_id);
                    WorkerReport {
                        worker_id,
                        ..WorkerReport::default()
                    }
                })
            })
            .collect()
    }
}

struct Worker {
    id: usize,
    ctx: Arc<CrawlContext>,
    sink: Box<dyn OutputSink>,
}

impl Worker {
    fn run(mut self) -> WorkerReport {
        let mut report = WorkerReport {
            worker_id: self.id,
            ..WorkerReport::default()
        };
        tracing::debug!("Worker {} started", self.id);

        while !self.ctx.detector.should_stop() {
            match self.ctx.frontier.checkout() {
                Some(entry) => {
                    self.ctx.board.set(self.id, WorkerState::Running);
                    let outcome = self.run_task(&entry);

                    report.tasks += 1;
                    match outcome {
                        TaskOutcome::Processed { .. } => report.records += 1,
                        TaskOutcome::FetchFailed => report.failures += 1,
                        TaskOutcome::DepthExceeded => {}
                    }
                }
                None => {
                    self.ctx.board.set(self.id, WorkerState::Idle);
                    if self.ctx.frontier.is_quiescent() {
                        self.ctx.halt(StopReason::Quiescent);
                        break;
                    }
                    self.ctx.frontier.wait_for_work(self.ctx.poll_interval);
                }
            }
        }

        self.ctx.board.set(self.id, WorkerState::Stopped);
        if let Err(e) = self.sink.finish() {
            tracing::warn!("Worker {} could not finish its output: {}", self.id, e);
        }
        tracing::debug!(
            "Worker {} stopped after {} tasks ({} records)",
            self.id,
            report.tasks,
            report.records
        );
        report
    }

    fn run_task(&mut self, entry: &FrontierEntry) -> TaskOutcome {
        let _in_flight = InFlight { ctx: &self.ctx };
        PageTask::new(&self.ctx, self.id).run(entry, self.sink.as_mut())
    }
}

/// Checks a task back in when dropped, declaring quiescence if it was the last
struct InFlight<'a> {
    ctx: &'a CrawlContext,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.ctx.frontier.checkin() {
            self.ctx.halt(StopReason::Quiescent);
        }
    }
}
