//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The shared frontier, visited set and per-domain throttle
//! - HTTP fetching and HTML parsing
//! - The per-URL page task and the worker pool running it
//! - Quiescence detection and overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod pool;
mod quiescence;
mod task;
mod throttle;
mod visited;

pub use coordinator::{crawl, CrawlReport, Crawler};
pub use fetcher::{build_http_client, fetch_url, FetchResult, Fetcher, HttpFetcher};
pub use frontier::{Frontier, FrontierEntry};
pub use parser::{parse_html, HtmlParser, PageParser, ParsedPage, NO_DESCRIPTION, NO_TITLE};
pub use pool::{WorkerPool, WorkerReport};
pub use quiescence::{PoolState, QuiescenceDetector, StopHandle, StopReason, WorkerBoard, WorkerState};
pub use task::{CrawlContext, PageTask, TaskOutcome};
pub use throttle::DomainThrottle;
pub use visited::VisitedSet;
