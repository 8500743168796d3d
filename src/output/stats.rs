//! Crawl statistics
//!
//! Counters are shared by all workers and updated with relaxed atomics; a
//! snapshot taken after the pool has joined is exact.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters updated by the workers
#[derive(Debug, Default)]
pub struct CrawlStats {
    pages_processed: AtomicU64,
    fetch_failures: AtomicU64,
    depth_skipped: AtomicU64,
    links_discovered: AtomicU64,
    links_enqueued: AtomicU64,
    sink_errors: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Pages fetched, parsed and recorded
    pub pages_processed: u64,

    /// Pages whose fetch failed (transport error or non-success status)
    pub fetch_failures: u64,

    /// Entries dropped because they exceeded the depth bound
    pub depth_skipped: u64,

    /// Links extracted from processed pages, before dedup
    pub links_discovered: u64,

    /// Links that won their dedup claim and were pushed to the frontier
    pub links_enqueued: u64,

    /// Records that could not be written to a worker's sink
    pub sink_errors: u64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_processed(&self, links_discovered: usize, links_enqueued: usize) {
        self.pages_processed.fetch_add(1, Ordering::Relaxed);
        self.links_discovered
            .fetch_add(links_discovered as u64, Ordering::Relaxed);
        self.links_enqueued
            .fetch_add(links_enqueued as u64, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_depth_skipped(&self) {
        self.depth_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sink_error(&self) {
        self.sink_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pages_processed: self.pages_processed.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            depth_skipped: self.depth_skipped.load(Ordering::Relaxed),
            links_discovered: self.links_discovered.load(Ordering::Relaxed),
            links_enqueued: self.links_enqueued.load(Ordering::Relaxed),
            sink_errors: self.sink_errors.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Pages that were attempted (fetched successfully or not)
    pub fn pages_attempted(&self) -> u64 {
        self.pages_processed + self.fetch_failures
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StatsSnapshot) {
    println!("=== Crawl Statistics ===\n");

    println!("Pages:");
    println!("  Processed: {}", stats.pages_processed);
    println!("  Fetch failures: {}", stats.fetch_failures);
    println!("  Skipped (depth): {}", stats.depth_skipped);
    println!();

    println!("Links:");
    println!("  Discovered: {}", stats.links_discovered);
    println!("  Enqueued: {}", stats.links_enqueued);
    println!();

    if stats.sink_errors > 0 {
        println!("Output write errors: {}", stats.sink_errors);
        println!();
    }

    let attempted = stats.pages_attempted();
    let success_rate = if attempted > 0 {
        (stats.pages_processed as f64 / attempted as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} pages successfully processed)",
        success_rate, stats.pages_processed, attempted
    );
}
