//! Per-worker JSON array file sink
//!
//! Each worker writes `thread_<id>.json` in the output directory. The file is a
//! JSON array that is opened on creation and closed by `finish`. A crawl that
//! dies before `finish` leaves an unterminated array; `finalize_output_dir`
//! repairs those.

use crate::output::traits::{OutputError, OutputResult, OutputSink, PageRecord};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const WORKER_FILE_PREFIX: &str = "thread_";
const WORKER_FILE_SUFFIX: &str = ".json";

/// Name of the output file owned by `worker_id`
pub fn worker_file_name(worker_id: usize) -> String {
    format!("{}{}{}", WORKER_FILE_PREFIX, worker_id, WORKER_FILE_SUFFIX)
}

/// Worker id encoded in a `thread_<id>.json` file name
///
/// Returns `None` for every other name, so callers can leave foreign files in
/// the output directory untouched.
pub fn parse_worker_file_name(name: &str) -> Option<usize> {
    let digits = name
        .strip_prefix(WORKER_FILE_PREFIX)?
        .strip_suffix(WORKER_FILE_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Worker output files in `dir`, ordered by worker id
pub fn worker_files(dir: &Path) -> OutputResult<Vec<(usize, PathBuf)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let worker_id = entry.file_name().to_str().and_then(parse_worker_file_name);
        if let Some(worker_id) = worker_id {
            files.push((worker_id, entry.path()));
        }
    }
    files.sort();
    Ok(files)
}

/// Writes records for a single worker into its own JSON array file
pub struct JsonFileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    records: usize,
}

impl JsonFileSink {
    /// Creates the output directory (if needed) and truncates the worker's file
    ///
    /// # Returns
    ///
    /// * `Ok(JsonFileSink)` - File opened and the array header written
    /// * `Err(OutputError)` - The directory or file could not be created
    pub fn create(dir: &Path, worker_id: usize) -> OutputResult<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(worker_file_name(worker_id));

        let mut writer = BufWriter::new(File::create(&path)?);
        writer.write_all(b"[")?;
        writer.flush()?;

        Ok(Self {
            path,
            writer: Some(writer),
            records: 0,
        })
    }

    /// Creates one sink per worker in `dir`
    ///
    /// Worker files left by an earlier run with more workers are removed, so
    /// the directory only ever holds this run's output.
    pub fn create_all(dir: &Path, workers: usize) -> OutputResult<Vec<Self>> {
        if dir.is_dir() {
            for (worker_id, path) in worker_files(dir)? {
                if worker_id >= workers {
                    tracing::debug!("Removing stale output file {}", path.display());
                    fs::remove_file(&path)?;
                }
            }
        }
        (0..workers).map(|id| Self::create(dir, id)).collect()
    }

    /// Path of the file this sink writes
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records appended so far
    pub fn records(&self) -> usize {
        self.records
    }
}

impl OutputSink for JsonFileSink {
    /// Appends one record
    ///
    /// A failed write can leave a partial record in the file. The sink then
    /// refuses further appends with `Closed`, so nothing is written after it.
    fn append(&mut self, record: &PageRecord) -> OutputResult<()> {
        let writer = self.writer.as_mut().ok_or(OutputError::Closed)?;

        let separator: &[u8] = if self.records == 0 { b"\n" } else { b",\n" };
        if let Err(e) = write_record(writer, separator, record) {
            tracing::warn!(
                "Output file {} is no longer writable: {}",
                self.path.display(),
                e
            );
            self.writer = None;
            return Err(e);
        }

        self.records += 1;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        let mut writer = self.writer.take().ok_or(OutputError::Closed)?;
        writer.write_all(b"\n]")?;
        writer.flush()?;
        Ok(())
    }
}

fn write_record(
    writer: &mut BufWriter<File>,
    separator: &[u8],
    record: &PageRecord,
) -> OutputResult<()> {
    writer.write_all(separator)?;
    serde_json::to_writer_pretty(&mut *writer, record)?;
    writer.flush()?;
    Ok(())
}
