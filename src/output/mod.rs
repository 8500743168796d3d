//! Output module for Ripple-Crawl
//!
//! This module defines the page record, the per-worker sink interface and its
//! implementations, the post-crawl finalization step, and crawl statistics.

mod finalize;
mod json;
mod memory;
mod stats;
mod traits;

pub use finalize::{finalize_output_dir, merge_output_dir};
pub use json::{parse_worker_file_name, worker_file_name, worker_files, JsonFileSink};
pub use memory::MemorySink;
pub use stats::{print_statistics, CrawlStats, StatsSnapshot};
pub use traits::{OutputError, OutputResult, OutputSink, PageRecord};
