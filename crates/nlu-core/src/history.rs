//! Append-only interaction log.
//!
//! One JSON record per line, UTF-8, appended per interaction and read back
//! newest first. The log path is injected at construction so tests can
//! point it at a scratch location. Writers from multiple processes are not
//! coordinated by any lock; appends are open-append-close and that is an
//! accepted limitation of the format, not a guarantee.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::PredictionResult;

/// One logged interaction. Entries are never mutated or deleted
/// individually; only a full-log clear is supported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// ISO-8601 timestamp of the interaction.
    pub timestamp: DateTime<Utc>,
    /// The user's input text. Older records used the key `message`.
    #[serde(alias = "message")]
    pub input: String,
    /// Backend kind ("local", "remote").
    #[serde(default)]
    pub model_type: String,
    /// Concrete model name, falling back to the backend kind.
    #[serde(default)]
    pub model: String,
    /// Predicted intent at the time of logging.
    #[serde(default)]
    pub intent: String,
    /// Top-level confidence; legacy records may only carry it inside
    /// `result`.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Full prediction result payload.
    pub result: PredictionResult,
}

impl HistoryEntry {
    /// Build an entry from a prediction, stamping the current time.
    pub fn from_prediction(
        input: impl Into<String>,
        model_type: impl Into<String>,
        model: impl Into<String>,
        result: PredictionResult,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            input: input.into(),
            model_type: model_type.into(),
            model: model.into(),
            intent: result.intent.clone(),
            confidence: Some(result.confidence),
            result,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize history entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Append-only JSONL store for `HistoryEntry` records.
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    /// Create a log over `path`. The file (and parent directories) are
    /// created lazily on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Callers on the prediction path treat failures as
    /// best-effort: log and move on, never fail the surrounding request.
    pub fn append(&self, entry: &HistoryEntry) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(entry)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Read back at most `limit` entries, newest first.
    ///
    /// Tolerant of legacy or partial records: unreadable lines are skipped
    /// with a warning, and a missing top-level `confidence` is derived from
    /// the nested result payload.
    pub fn read(&self, limit: usize) -> Result<Vec<HistoryEntry>, HistoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = std::fs::File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut entries: Vec<HistoryEntry> = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryEntry>(&line) {
                Ok(mut entry) => {
                    if entry.confidence.is_none() {
                        entry.confidence = Some(entry.result.confidence);
                    }
                    entries.push(entry);
                }
                Err(e) => {
                    tracing::warn!(line = line_no + 1, error = %e, "skipping unreadable history record");
                }
            }
        }

        // On-disk order is insertion order; read-back reverses it.
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }

    /// Remove the entire backing store. No-op when nothing exists.
    pub fn clear(&self) -> Result<(), HistoryError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::PredictionResult;
    use std::collections::BTreeMap;

    fn log_in(dir: &tempfile::TempDir) -> HistoryLog {
        HistoryLog::new(dir.path().join("history.jsonl"))
    }

    fn entry(input: &str, intent: &str, confidence: f64) -> HistoryEntry {
        HistoryEntry::from_prediction(
            input,
            "local",
            "gemma",
            PredictionResult {
                intent: intent.to_string(),
                confidence,
                entities: BTreeMap::new(),
                response: None,
                error: None,
            },
        )
    }

    #[test]
    fn read_returns_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(&dir);

        log.append(&entry("first", "greet", 0.9)).unwrap();
        log.append(&entry("second", "book_flight", 0.8)).unwrap();

        let entries = log.read(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].input, "second");
        assert_eq!(entries[1].input, "first");
    }

    #[test]
    fn read_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(&dir);

        log.append(&entry("e1", "a", 0.1)).unwrap();
        log.append(&entry("e2", "b", 0.2)).unwrap();

        let entries = log.read(1).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].input, "e2");
    }

    #[test]
    fn clear_then_read_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(&dir);

        log.append(&entry("e1", "a", 0.1)).unwrap();
        log.clear().unwrap();
        assert!(log.read(200).unwrap().is_empty());
    }

    #[test]
    fn clear_without_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        assert!(log_in(&dir).clear().is_ok());
    }

    #[test]
    fn read_without_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(log_in(&dir).read(200).unwrap().is_empty());
    }

    #[test]
    fn legacy_record_confidence_derived_from_result() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(&dir);

        // Legacy shape: `message` instead of `input`, no top-level confidence.
        let legacy = r#"{"timestamp":"2024-03-01T10:00:00Z","message":"old input","model_type":"local","model":"gemma","intent":"greet","result":{"intent":"greet","confidence":0.7,"entities":{}}}"#;
        std::fs::write(log.path(), format!("{legacy}\n")).unwrap();

        let entries = log.read(10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].input, "old input");
        assert_eq!(entries[0].confidence, Some(0.7));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(&dir);

        log.append(&entry("good", "greet", 0.9)).unwrap();
        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        writeln!(file, "this is not json").unwrap();
        drop(file);
        log.append(&entry("also good", "greet", 0.8)).unwrap();

        let entries = log.read(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].input, "also good");
    }

    #[test]
    fn nested_directories_created_on_append() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(dir.path().join("deep/nested/history.jsonl"));
        log.append(&entry("e1", "a", 0.5)).unwrap();
        assert_eq!(log.read(10).unwrap().len(), 1);
    }
}
