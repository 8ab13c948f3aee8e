//! Audit sink: append-only record of decisions and their rationale.
//!
//! Records render as `[<ISO-8601 timestamp>] <LEVEL>: <message>`. Nothing in
//! the agent reads them back; they exist for external observability. There
//! is no rotation or deduplication.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::error::{AgentError, AgentResult};

/// One audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    /// Upper-cased level, e.g. `INFO`.
    pub level: String,
    pub message: String,
}

impl AuditRecord {
    /// Stamp a new record with the current time.
    pub fn now(level: &str, message: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            level: level.trim().to_uppercase(),
            message: message.to_string(),
        }
    }

    /// The log-file line for this record, without the trailing newline.
    ///
    /// Newlines inside the message are escaped so one record stays one line.
    pub fn to_line(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            self.level,
            self.message.replace('\n', "\\n"),
        )
    }
}

/// Append-only destination for audit records.
pub trait AuditSink: Send + Sync {
    /// Append a record. Fails only when the backing store is unwritable.
    fn record(&self, level: &str, message: &str) -> AgentResult<AuditRecord>;
}

/// Appends records to a text file, one line each.
#[derive(Debug)]
pub struct FileAuditSink {
    path: PathBuf,
    // Serializes appends from concurrent orchestrator calls.
    write_lock: Mutex<()>,
}

impl FileAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, level: &str, message: &str) -> AgentResult<AuditRecord> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        // Stamped under the lock so file order matches timestamp order.
        let record = AuditRecord::now(level, message);
        self.append(&record.to_line())
            .map_err(|source| AgentError::AuditWrite {
                path: self.path.display().to_string(),
                source,
            })?;
        Ok(record)
    }
}

/// Keeps records in memory, in write order.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records written so far.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, level: &str, message: &str) -> AgentResult<AuditRecord> {
        let mut records = self.records.lock().unwrap_or_else(|p| p.into_inner());
        let record = AuditRecord::now(level, message);
        records.push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_format() {
        let record = AuditRecord::now("info", "Decision: act");
        let line = record.to_line();
        assert!(line.starts_with('['));
        assert!(line.ends_with("] INFO: Decision: act"));
        let ts = &line[1..line.find(']').unwrap()];
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[test]
    fn multiline_message_stays_on_one_line() {
        let line = AuditRecord::now("warn", "a\nb").to_line();
        assert_eq!(line.lines().count(), 1);
        assert!(line.ends_with("WARN: a\\nb"));
    }

    #[test]
    fn file_sink_appends_in_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let sink = FileAuditSink::new(dir.path().join("logs/agent.log"));
        sink.record("info", "first").unwrap();
        sink.record("error", "second").unwrap();
        let content = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("INFO: first"));
        assert!(lines[1].ends_with("ERROR: second"));
    }

    #[test]
    fn file_sink_reports_unwritable_path() {
        let dir = tempfile::TempDir::new().unwrap();
        // A directory cannot be opened for appending.
        let sink = FileAuditSink::new(dir.path());
        assert!(matches!(
            sink.record("info", "x"),
            Err(AgentError::AuditWrite { .. })
        ));
    }

    #[test]
    fn concurrent_appends_do_not_interleave() {
        let dir = tempfile::TempDir::new().unwrap();
        let sink = std::sync::Arc::new(FileAuditSink::new(dir.path().join("agent.log")));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        sink.record("info", &format!("thread {t} entry {i}")).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let content = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(content.lines().count(), 200);
        assert!(content.lines().all(|l| l.contains("] INFO: thread ")));

        let stamps: Vec<DateTime<Utc>> = content
            .lines()
            .map(|l| {
                DateTime::parse_from_rfc3339(&l[1..l.find(']').unwrap()])
                    .unwrap()
                    .with_timezone(&Utc)
            })
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]), "timestamps out of order");
    }

    #[test]
    fn memory_sink_orders_concurrent_records() {
        let sink = std::sync::Arc::new(MemoryAuditSink::new());
        std::thread::scope(|scope| {
            for t in 0..8 {
                let sink = &sink;
                scope.spawn(move || {
                    for i in 0..25 {
                        sink.record("info", &format!("thread {t} entry {i}")).unwrap();
                    }
                });
            }
        });
        let records = sink.records();
        assert_eq!(records.len(), 200);
        assert!(records.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn memory_sink_keeps_records() {
        let sink = MemoryAuditSink::new();
        assert!(sink.is_empty());
        sink.record("info", "hello").unwrap();
        assert_eq!(sink.records()[0].message, "hello");
        assert_eq!(sink.records()[0].level, "INFO");
    }
}
