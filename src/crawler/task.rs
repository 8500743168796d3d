//! Per-URL pipeline
//!
//! A task runs as: depth check, throttle gate, fetch, parse, emit record,
//! dedup-claim and push discovered links, record the domain's request time.
//! Nothing here holds a shared lock during the fetch or the parse.

use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::parser::PageParser;
use crate::crawler::quiescence::{QuiescenceDetector, StopReason, WorkerBoard};
use crate::crawler::throttle::DomainThrottle;
use crate::crawler::visited::VisitedSet;
use crate::output::{CrawlStats, OutputSink, PageRecord};
use crate::url::{domain_of, normalize_url};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// State shared by every worker of one crawl
pub struct CrawlContext {
    pub frontier: Arc<Frontier>,
    pub visited: VisitedSet,
    pub throttle: DomainThrottle,
    pub fetcher: Arc<dyn Fetcher>,
    pub parser: Arc<dyn PageParser>,
    pub detector: Arc<QuiescenceDetector>,
    pub board: WorkerBoard,
    pub stats: CrawlStats,
    pub max_depth: u32,
    pub poll_interval: Duration,
}

impl CrawlContext {
    /// Declares the stop decision and wakes every idle worker
    pub fn halt(&self, reason: StopReason) {
        if self.detector.declare(reason) {
            tracing::info!(
                "Crawl stopping ({:?}): {} URLs claimed",
                reason,
                self.visited.len()
            );
        }
        self.frontier.close();
    }
}

/// What happened to one frontier entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Entry was deeper than the bound; nothing was fetched
    DepthExceeded,
    /// Transport failure or non-success status; no record, no links
    FetchFailed,
    /// Record emitted; `links_enqueued` new entries pushed
    Processed { links_enqueued: usize },
}

/// One execution of the pipeline for one frontier entry
pub struct PageTask<'a> {
    ctx: &'a CrawlContext,
    worker_id: usize,
}

impl<'a> PageTask<'a> {
    pub fn new(ctx: &'a CrawlContext, worker_id: usize) -> Self {
        Self { ctx, worker_id }
    }

    pub fn run(&self, entry: &FrontierEntry, sink: &mut dyn OutputSink) -> TaskOutcome {
        if entry.depth > self.ctx.max_depth {
            tracing::debug!(
                "Skipping {} at depth {} (max {})",
                entry.url,
                entry.depth,
                self.ctx.max_depth
            );
            self.ctx.stats.record_depth_skipped();
            return TaskOutcome::DepthExceeded;
        }

        let domain = domain_of(&entry.url);
        self.ctx.throttle.wait(&domain);

        tracing::debug!(
            "[worker {}] Fetching {} (depth {})",
            self.worker_id,
            entry.url,
            entry.depth
        );

        let outcome = match self.ctx.fetcher.fetch(&entry.url) {
            FetchResult::Success {
                final_url, body, ..
            } => self.process(entry, &final_url, &body, sink),
            FetchResult::HttpError { status_code } => {
                tracing::warn!("HTTP {} for {}", status_code, entry.url);
                self.ctx.stats.record_fetch_failure();
                TaskOutcome::FetchFailed
            }
            FetchResult::NetworkError { error } => {
                tracing::warn!("Failed to fetch {}: {}", entry.url, error);
                self.ctx.stats.record_fetch_failure();
                TaskOutcome::FetchFailed
            }
        };

        self.ctx.throttle.record(&domain);
        outcome
    }

    fn process(
        &self,
        entry: &FrontierEntry,
        final_url: &str,
        body: &str,
        sink: &mut dyn OutputSink,
    ) -> TaskOutcome {
        // Relative links resolve against where the redirects ended up
        let base = match Url::parse(final_url).or_else(|_| Url::parse(&entry.url)) {
            Ok(base) => base,
            Err(e) => {
                tracing::warn!("Cannot use {} as a base URL: {}", entry.url, e);
                self.ctx.stats.record_fetch_failure();
                return TaskOutcome::FetchFailed;
            }
        };

        let parsed = self.ctx.parser.parse(body, &base);
        let record = PageRecord {
            url: entry.url.clone(),
            title: parsed.title,
            description: parsed.description,
            depth: entry.depth,
            links: parsed.links,
        };

        if let Err(e) = sink.append(&record) {
            tracing::warn!(
                "[worker {}] Failed to write record for {}: {}",
                self.worker_id,
                record.url,
                e
            );
            self.ctx.stats.record_sink_error();
        }

        let links_enqueued = self.enqueue_links(&record.links, entry.depth);
        self.ctx
            .stats
            .record_processed(record.links.len(), links_enqueued);

        tracing::debug!(
            "Processed {}: {} links, {} new",
            record.url,
            record.links.len(),
            links_enqueued
        );

        TaskOutcome::Processed { links_enqueued }
    }

    /// Claims and pushes every link that is new and within the depth bound
    fn enqueue_links(&self, links: &[String], depth: u32) -> usize {
        let next_depth = depth + 1;
        // Links that could never be pushed are not claimed either, so a
        // shallower path to the same URL can still enqueue it
        if next_depth > self.ctx.max_depth {
            return 0;
        }

        let mut enqueued = 0;
        for link in links {
            let normalized = match normalize_url(link) {
                Ok(url) => url,
                Err(e) => {
                    tracing::trace!("Dropping link {}: {}", link, e);
                    continue;
                }
            };

            if self.ctx.visited.try_claim(normalized.as_str()) {
                self.ctx
                    .frontier
                    .push(FrontierEntry::new(normalized.as_str(), next_depth));
                enqueued += 1;
            }
        }
        enqueued
    }
}
