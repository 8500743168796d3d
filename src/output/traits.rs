//! Output sink trait and record type
//!
//! Every worker owns exactly one sink, so sinks never need a shared lock.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Sink has already been finished")]
    Closed,
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Structured metadata for one successfully fetched and parsed page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// The URL that was fetched
    pub url: String,

    /// Page title, or "No title"
    pub title: String,

    /// Meta description, or "No description"
    pub description: String,

    /// Distance from the seed (seed is 0)
    pub depth: u32,

    /// Outgoing links in document order, absolute
    pub links: Vec<String>,
}

/// Append-only destination for page records
pub trait OutputSink: Send {
    /// Appends one record
    fn append(&mut self, record: &PageRecord) -> OutputResult<()>;

    /// Flushes and closes the container; further appends fail with `Closed`
    fn finish(&mut self) -> OutputResult<()>;
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn append(&mut self, record: &PageRecord) -> OutputResult<()> {
        (**self).append(record)
    }

    fn finish(&mut self) -> OutputResult<()> {
        (**self).finish()
    }
}
