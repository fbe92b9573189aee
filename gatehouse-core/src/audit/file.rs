//! JSON-lines audit sink.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{AuditEntry, AuditError, AuditQuery, AuditRecord, AuditSink};

/// Append-only audit sink writing one JSON object per line.
///
/// The file and its parent directories are created on open. Queries read
/// the whole file back, skipping lines that fail to parse. File IO runs on
/// the blocking pool so a slow disk never stalls the runtime.
pub struct FileAuditSink {
    inner: Arc<TrailFile>,
}

struct TrailFile {
    path: PathBuf,
    file: Mutex<File>,
}

impl TrailFile {
    fn append(&self, line: &str) -> Result<(), AuditError> {
        let mut file = self.file.lock();
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }

    fn read_entries(&self) -> Result<Vec<AuditEntry>, AuditError> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "skipping malformed audit line"),
            }
        }
        Ok(entries)
    }
}

impl FileAuditSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            inner: Arc::new(TrailFile {
                path,
                file: Mutex::new(file),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<AuditEntry, AuditError> {
        let entry = AuditEntry::from_record(record);
        let line = serde_json::to_string(&entry)?;
        let inner = self.inner.clone();

        tokio::task::spawn_blocking(move || inner.append(&line))
            .await
            .map_err(|e| AuditError::Background(e.to_string()))??;
        Ok(entry)
    }

    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditError> {
        let inner = self.inner.clone();
        let entries = tokio::task::spawn_blocking(move || inner.read_entries())
            .await
            .map_err(|e| AuditError::Background(e.to_string()))??;
        Ok(query.apply(entries.iter()))
    }
}
