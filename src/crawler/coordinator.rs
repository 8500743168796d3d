//! Crawler coordinator - crawl lifecycle and orchestration
//!
//! This module owns the lifecycle of one crawl:
//! - Validating configuration and wiring the shared state
//! - Seeding the frontier and spawning the worker pool
//! - Waiting for quiescence, or forcing an early stop
//! - Joining workers and reporting the outcome

use crate::config::{validate, validate_seed, Config};
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::parser::{HtmlParser, PageParser};
use crate::crawler::pool::{WorkerPool, WorkerReport};
use crate::crawler::quiescence::{
    PoolState, QuiescenceDetector, StopHandle, StopReason, WorkerBoard, WorkerState,
};
use crate::crawler::task::CrawlContext;
use crate::crawler::throttle::DomainThrottle;
use crate::crawler::visited::VisitedSet;
use crate::output::{finalize_output_dir, CrawlStats, JsonFileSink, OutputSink, StatsSnapshot};
use crate::url::normalize_url;
use crate::{ConfigError, CrawlError};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Why the crawl stopped
    pub reason: StopReason,
    /// Counters at the moment the last worker was joined
    pub stats: StatsSnapshot,
    /// One entry per worker, in worker id order
    pub workers: Vec<WorkerReport>,
    /// Wall time from `start` to the join
    pub elapsed: Duration,
}

/// Main crawler structure
///
/// ```no_run
/// use std::sync::Arc;
/// use ripple_crawl::config::Config;
/// use ripple_crawl::crawler::{Crawler, HtmlParser, HttpFetcher};
/// use ripple_crawl::output::{MemorySink, OutputSink};
///
/// let config = Config::default();
/// let fetcher = Arc::new(HttpFetcher::new(&config.fetcher).unwrap());
/// let sink = MemorySink::new();
/// let sinks: Vec<Box<dyn OutputSink>> = (0..config.crawler.workers)
///     .map(|_| Box::new(sink.clone()) as Box<dyn OutputSink>)
///     .collect();
///
/// let mut crawler = Crawler::new(&config, fetcher, Arc::new(HtmlParser), sinks).unwrap();
/// crawler.start("https://example.com/").unwrap();
/// let report = crawler.wait_for_completion().unwrap();
/// println!("{} pages", report.stats.pages_processed);
/// ```
pub struct Crawler {
    ctx: Arc<CrawlContext>,
    sinks: Vec<Box<dyn OutputSink>>,
    pool: Option<WorkerPool>,
    started_at: Option<Instant>,
    report: Option<CrawlReport>,
}

impl Crawler {
    /// Creates a crawler; nothing runs until `start`
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration (validated here)
    /// * `fetcher` - Source of page bodies
    /// * `parser` - Extracts title, description and links
    /// * `sinks` - Exactly one output sink per worker
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to start
    /// * `Err(CrawlError::Config)` - Invalid configuration or sink count
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn Fetcher>,
        parser: Arc<dyn PageParser>,
        sinks: Vec<Box<dyn OutputSink>>,
    ) -> Result<Self, CrawlError> {
        validate(config)?;

        let workers = config.crawler.workers;
        if sinks.len() != workers {
            return Err(ConfigError::Validation(format!(
                "expected one output sink per worker ({}), got {}",
                workers,
                sinks.len()
            ))
            .into());
        }

        let ctx = CrawlContext {
            frontier: Arc::new(Frontier::new()),
            visited: VisitedSet::new(),
            throttle: DomainThrottle::new(Duration::from_millis(config.crawler.delay_ms)),
            fetcher,
            parser,
            detector: Arc::new(QuiescenceDetector::new()),
            board: WorkerBoard::new(workers),
            stats: CrawlStats::new(),
            max_depth: config.crawler.max_depth,
            poll_interval: Duration::from_millis(config.crawler.poll_interval_ms),
        };

        Ok(Self {
            ctx: Arc::new(ctx),
            sinks,
            pool: None,
            started_at: None,
            report: None,
        })
    }

    /// Seeds the frontier and starts the workers; returns immediately
    ///
    /// The seed is claimed in the visited set and pushed at depth 0 before any
    /// worker exists.
    pub fn start(&mut self, seed: &str) -> Result<(), CrawlError> {
        if self.started_at.is_some() {
            return Err(CrawlError::AlreadyStarted);
        }

        validate_seed(seed)?;
        let seed = normalize_url(seed)?;

        self.ctx.visited.try_claim(seed.as_str());
        self.ctx
            .frontier
            .push(FrontierEntry::new(seed.as_str(), 0));

        tracing::info!(
            "Starting crawl from {} (max depth {}, {} workers, {:?} per-domain delay)",
            seed,
            self.ctx.max_depth,
            self.sinks.len(),
            self.ctx.throttle.delay()
        );

        let sinks = std::mem::take(&mut self.sinks);
        self.started_at = Some(Instant::now());
        self.pool = Some(WorkerPool::spawn(Arc::clone(&self.ctx), sinks)?);
        Ok(())
    }

    /// Blocks until the crawl is quiescent (or stopped) and all workers joined
    ///
    /// Calling it again after completion returns the same report.
    pub fn wait_for_completion(&mut self) -> Result<CrawlReport, CrawlError> {
        if let Some(report) = &self.report {
            return Ok(report.clone());
        }
        if self.pool.is_none() {
            return Err(CrawlError::NotStarted);
        }

        self.ctx.detector.wait();
        Ok(self.join())
    }

    /// Forces early termination regardless of remaining frontier contents
    ///
    /// In-flight fetches finish; no new task starts.
    pub fn stop(&mut self) -> Result<CrawlReport, CrawlError> {
        if let Some(report) = &self.report {
            return Ok(report.clone());
        }
        if self.pool.is_none() {
            return Err(CrawlError::NotStarted);
        }

        self.stop_handle().stop();
        Ok(self.join())
    }

    /// Handle for stopping the crawl from another thread
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(
            Arc::clone(&self.ctx.detector),
            Arc::clone(&self.ctx.frontier),
        )
    }

    pub fn pool_state(&self) -> PoolState {
        if self.report.is_some() {
            PoolState::Stopped
        } else if self.pool.is_none() {
            PoolState::Idle
        } else if self.ctx.detector.should_stop() {
            PoolState::Draining
        } else {
            PoolState::Active
        }
    }

    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.ctx.board.snapshot()
    }

    /// Number of workers currently running a task or polling
    pub fn active_workers(&self) -> usize {
        self.ctx.board.active()
    }

    /// Live counters
    pub fn stats(&self) -> StatsSnapshot {
        self.ctx.stats.snapshot()
    }

    /// Number of URLs claimed so far (seed included)
    pub fn visited_count(&self) -> usize {
        self.ctx.visited.len()
    }

    fn join(&mut self) -> CrawlReport {
        let workers = self.pool.take().map(WorkerPool::join).unwrap_or_default();
        let reason = self
            .ctx
            .detector
            .reason()
            .unwrap_or(StopReason::Requested);
        let elapsed = self
            .started_at
            .map(|started| started.elapsed())
            .unwrap_or_default();

        let report = CrawlReport {
            reason,
            stats: self.ctx.stats.snapshot(),
            workers,
            elapsed,
        };

        tracing::info!(
            "Crawl finished ({:?}): {} pages processed, {} failures, {} URLs claimed in {:?}",
            report.reason,
            report.stats.pages_processed,
            report.stats.fetch_failures,
            self.ctx.visited.len(),
            report.elapsed
        );

        self.report = Some(report.clone());
        report
    }
}

impl Drop for Crawler {
    fn drop(&mut self) {
        if self.pool.is_some() {
            self.stop_handle().stop();
            self.join();
        }
    }
}

/// Runs a complete crawl with the HTTP fetcher and per-worker JSON files
///
/// This is the function the binary calls:
/// 1. Validates the configuration and seed
/// 2. Opens `thread_<id>.json` for every worker (fatal on failure)
/// 3. Crawls to quiescence
/// 4. Repairs the output files if `output.finalize` is set
pub fn crawl(config: &Config, seed: &str) -> Result<CrawlReport, CrawlError> {
    validate(config)?;
    validate_seed(seed)?;

    let fetcher = Arc::new(HttpFetcher::new(&config.fetcher)?);
    let output_dir = Path::new(&config.output.directory);
    let sinks: Vec<Box<dyn OutputSink>> =
        JsonFileSink::create_all(output_dir, config.crawler.workers)?
            .into_iter()
            .map(|sink| Box::new(sink) as Box<dyn OutputSink>)
            .collect();

    let mut crawler = Crawler::new(config, fetcher, Arc::new(HtmlParser), sinks)?;
    crawler.start(seed)?;
    let report = crawler.wait_for_completion()?;

    if config.output.finalize {
        let repaired = finalize_output_dir(output_dir)?;
        tracing::info!(
            "Finalized output in {} ({} files repaired)",
            output_dir.display(),
            repaired
        );
    }

    Ok(report)
}
