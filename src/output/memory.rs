use crate::output::traits::{OutputError, OutputResult, OutputSink, PageRecord};
use std::sync::{Arc, Mutex, PoisonError};

/// In-memory sink; clones share the same record list
///
/// Useful for embedding the crawler in another program, and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<PageRecord>>>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything appended through any clone of this sink
    pub fn records(&self) -> Vec<PageRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OutputSink for MemorySink {
    fn append(&mut self, record: &PageRecord) -> OutputResult<()> {
        if self.finished {
            return Err(OutputError::Closed);
        }
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Err(OutputError::Closed);
        }
        self.finished = true;
        Ok(())
    }
}
