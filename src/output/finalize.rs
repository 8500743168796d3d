//! Post-crawl repair and merge of per-worker output files
//!
//! The crawl produces one JSON array per worker. If a worker never reached
//! `finish` (the process was killed, say) its file lacks the closing bracket.
//! `finalize_output_dir` closes such files; `merge_output_dir` reads every
//! worker's list back as one combined list.

use crate::output::json::worker_files;
use crate::output::traits::{OutputResult, PageRecord};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Repairs every worker file in `dir` into a syntactically closed JSON array
///
/// Only `thread_<id>.json` files are touched; anything else in the directory
/// is left alone.
///
/// * empty file → `[]`
/// * content not ending in `]` → `\n]` appended
///
/// # Returns
///
/// The number of files that were modified.
pub fn finalize_output_dir(dir: &Path) -> OutputResult<usize> {
    let mut repaired = 0;

    for (_, path) in worker_files(dir)? {
        let content = fs::read(&path)?;
        let last = content.iter().rposition(|b| !b.is_ascii_whitespace());

        if last.is_none() {
            fs::write(&path, "[]")?;
        } else if last.map(|i| content[i]) != Some(b']') {
            let mut file = OpenOptions::new().append(true).open(&path)?;
            file.write_all(b"\n]")?;
        } else {
            continue;
        }

        tracing::debug!("Repaired output file {}", path.display());
        repaired += 1;
    }

    Ok(repaired)
}

/// Reads every worker file in `dir` and concatenates their records
///
/// Files are visited in worker id order, so the result is deterministic for a
/// given directory. Within one file, records keep their completion order.
pub fn merge_output_dir(dir: &Path) -> OutputResult<Vec<PageRecord>> {
    let mut merged = Vec::new();

    for (_, path) in worker_files(dir)? {
        let content = fs::read_to_string(&path)?;
        let records: Vec<PageRecord> = serde_json::from_str(&content)?;
        merged.extend(records);
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::json::JsonFileSink;
    use crate::output::traits::OutputSink;
    use tempfile::tempdir;

    fn record(url: &str) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            title: "No title".to_string(),
            description: "No description".to_string(),
            depth: 0,
            links: vec![],
        }
    }

    #[test]
    fn test_empty_file_becomes_empty_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("thread_0.json");
        fs::write(&path, "").unwrap();

        assert_eq!(finalize_output_dir(dir.path()).unwrap(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
    }

    #[test]
    fn test_unterminated_array_is_closed() {
        let dir = tempdir().unwrap();
        let mut sink = JsonFileSink::create(dir.path(), 0).unwrap();
        sink.append(&record("https://example.com/")).unwrap();
        // No finish: simulates a worker that died mid-crawl
        drop(sink);

        assert_eq!(finalize_output_dir(dir.path()).unwrap(), 1);

        let merged = merge_output_dir(dir.path()).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].url, "https://example.com/");
    }

    #[test]
    fn test_closed_files_are_left_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("thread_0.json");
        fs::write(&path, "[]\n").unwrap();

        assert_eq!(finalize_output_dir(dir.path()).unwrap(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]\n");
    }

    #[test]
    fn test_merge_concatenates_worker_files_in_name_order() {
        let dir = tempdir().unwrap();
        let mut first = JsonFileSink::create(dir.path(), 0).unwrap();
        let mut second = JsonFileSink::create(dir.path(), 1).unwrap();

        first.append(&record("https://a.example/")).unwrap();
        second.append(&record("https://b.example/")).unwrap();
        second.append(&record("https://c.example/")).unwrap();
        first.finish().unwrap();
        second.finish().unwrap();

        let urls: Vec<String> = merge_output_dir(dir.path())
            .unwrap()
            .into_iter()
            .map(|r| r.url)
            .collect();
        assert_eq!(
            urls,
            vec!["https://a.example/", "https://b.example/", "https://c.example/"]
        );
    }

    #[test]
    fn test_foreign_files_are_left_alone() {
        let dir = tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        let other_json = dir.path().join("data.json");
        let image = dir.path().join("image.png");
        fs::write(&notes, "keep me").unwrap();
        fs::write(&other_json, "").unwrap();
        fs::write(&image, [0xffu8, 0xfe, 0x00]).unwrap();

        let mut sink = JsonFileSink::create(dir.path(), 0).unwrap();
        sink.append(&record("https://example.com/")).unwrap();
        drop(sink);

        assert_eq!(finalize_output_dir(dir.path()).unwrap(), 1);
        assert_eq!(fs::read_to_string(&notes).unwrap(), "keep me");
        assert_eq!(fs::read_to_string(&other_json).unwrap(), "");
        assert_eq!(fs::read(&image).unwrap(), vec![0xff, 0xfe, 0x00]);

        let merged = merge_output_dir(dir.path()).unwrap();
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_non_utf8_worker_file_is_still_closed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("thread_0.json");
        fs::write(&path, [b'[', 0xff]).unwrap();

        assert_eq!(finalize_output_dir(dir.path()).unwrap(), 1);
        assert!(fs::read(&path).unwrap().ends_with(b"\n]"));
    }

    #[test]
    fn test_merge_orders_by_worker_id() {
        let dir = tempdir().unwrap();
        for id in [10, 2] {
            let mut sink = JsonFileSink::create(dir.path(), id).unwrap();
            sink.append(&record(&format!("https://example.com/{}", id)))
                .unwrap();
            sink.finish().unwrap();
        }

        let urls: Vec<String> = merge_output_dir(dir.path())
            .unwrap()
            .into_iter()
            .map(|r| r.url)
            .collect();
        assert_eq!(urls, vec!["https://example.com/2", "https://example.com/10"]);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        assert!(finalize_output_dir(Path::new("/nonexistent/ripple-out")).is_err());
    }
}
