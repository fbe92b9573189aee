//! In-memory audit sink.

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{AuditEntry, AuditError, AuditQuery, AuditRecord, AuditSink};

/// Audit sink that keeps entries in memory.
///
/// Entries are lost when the process exits. This is the default sink used
/// by the orchestrator.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: RwLock<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<AuditEntry, AuditError> {
        let entry = AuditEntry::from_record(record);
        self.entries.write().push(entry.clone());
        Ok(entry)
    }

    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(query.apply(self.entries.read().iter()))
    }
}
