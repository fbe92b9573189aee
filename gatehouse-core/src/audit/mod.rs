//! Audit trail for policy decisions and tool outcomes.
//!
//! The orchestrator writes one [`AuditRecord`] per step of a tool call.
//! A sink turns it into a persisted [`AuditEntry`] and can answer filtered
//! queries over the trail.
//!
//! - **[`AuditSink`]**: trait for audit storage
//! - **[`MemoryAuditSink`]**: in-memory trail (cleared on exit)
//! - **[`FileAuditSink`]**: append-only JSON-lines file
//! - **[`export_entries`]**: CSV or JSON export of a query result

mod export;
mod file;
mod memory;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use export::{export_entries, ExportFormat, CSV_RESULT_CHARS};
pub use file::FileAuditSink;
pub use memory::MemoryAuditSink;

/// Maximum number of characters of a tool result kept in the trail.
pub const MAX_AUDIT_RESULT_CHARS: usize = 1000;

/// Kind of audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    ToolRequested,
    ToolApproved,
    ToolRejected,
    ToolExecuted,
    ToolFailed,
    PermissionRevoked,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::ToolRequested => "tool_requested",
            AuditEventType::ToolApproved => "tool_approved",
            AuditEventType::ToolRejected => "tool_rejected",
            AuditEventType::ToolExecuted => "tool_executed",
            AuditEventType::ToolFailed => "tool_failed",
            AuditEventType::PermissionRevoked => "permission_revoked",
        }
    }

    /// Whether this event closes a tool call.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuditEventType::ToolRejected | AuditEventType::ToolExecuted | AuditEventType::ToolFailed
        )
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in audit sink operations.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// IO error while reading or writing the trail.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The sink did not answer in time.
    #[error("Audit write timed out")]
    Timeout,

    /// The blocking IO task died before finishing.
    #[error("Audit task failed: {0}")]
    Background(String),
}

/// What the orchestrator asks a sink to record.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub session_id: String,
    pub event_type: AuditEventType,
    pub tool_name: Option<String>,
    pub params: Option<Value>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub decision: Option<String>,
    pub duration_ms: Option<u64>,
}

impl AuditRecord {
    pub fn new(session_id: impl Into<String>, event_type: AuditEventType) -> Self {
        Self {
            session_id: session_id.into(),
            event_type,
            tool_name: None,
            params: None,
            result: None,
            error: None,
            decision: None,
            duration_ms: None,
        }
    }

    pub fn tool(mut self, name: impl Into<String>, params: &Value) -> Self {
        self.tool_name = Some(name.into());
        self.params = Some(params.clone());
        self
    }

    pub fn result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn decision(mut self, decision: impl Into<String>) -> Self {
        self.decision = Some(decision.into());
        self
    }

    pub fn duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }
}

/// A persisted audit event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_decision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
}

impl AuditEntry {
    /// Stamp a record with an id and the current time.
    ///
    /// The result is cut to [`MAX_AUDIT_RESULT_CHARS`]; every sink builds
    /// its entries through here.
    pub fn from_record(record: AuditRecord) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: record.session_id,
            timestamp: Utc::now(),
            event_type: record.event_type,
            tool_name: record.tool_name,
            params: record.params,
            result: record
                .result
                .map(|r| truncate_chars(&r, MAX_AUDIT_RESULT_CHARS)),
            error: record.error,
            user_decision: record.decision,
            execution_time_ms: record.duration_ms,
        }
    }
}

/// Filter for reading the trail back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditQuery {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub event_type: Option<AuditEventType>,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    100
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            session_id: None,
            event_type: None,
            tool_name: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl AuditQuery {
    pub fn session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Self::default()
        }
    }

    pub fn with_event_type(mut self, event_type: AuditEventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool_name = Some(tool.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.session_id
            .as_deref()
            .map_or(true, |s| entry.session_id == s)
            && self.event_type.map_or(true, |t| entry.event_type == t)
            && self
                .tool_name
                .as_deref()
                .map_or(true, |t| entry.tool_name.as_deref() == Some(t))
    }

    /// Apply the filter to entries stored oldest first, returning newest first.
    pub fn apply<'a>(&self, entries: impl DoubleEndedIterator<Item = &'a AuditEntry>) -> Vec<AuditEntry> {
        entries
            .rev()
            .filter(|e| self.matches(e))
            .skip(self.offset)
            .take(self.limit)
            .cloned()
            .collect()
    }
}

/// Aggregate numbers over a set of entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditStats {
    pub total: usize,
    pub by_event_type: BTreeMap<AuditEventType, usize>,
    pub by_tool: BTreeMap<String, usize>,
    pub avg_execution_time_ms: Option<f64>,
}

impl AuditStats {
    pub fn from_entries(entries: &[AuditEntry]) -> Self {
        let mut stats = AuditStats {
            total: entries.len(),
            ..Default::default()
        };
        let mut timed = 0u64;
        let mut total_ms = 0u64;

        for entry in entries {
            *stats.by_event_type.entry(entry.event_type).or_default() += 1;
            if let Some(tool) = &entry.tool_name {
                *stats.by_tool.entry(tool.clone()).or_default() += 1;
            }
            if let Some(ms) = entry.execution_time_ms {
                timed += 1;
                total_ms += ms;
            }
        }

        if timed > 0 {
            stats.avg_execution_time_ms = Some(total_ms as f64 / timed as f64);
        }
        stats
    }
}

/// Storage for the audit trail.
///
/// `record` is called from inside the orchestrator loop and must return
/// quickly. Implementations build entries with [`AuditEntry::from_record`].
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist a record and return the stored entry.
    async fn record(&self, record: AuditRecord) -> Result<AuditEntry, AuditError>;

    /// Read entries matching a query, newest first.
    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditError>;
}

/// Cut a string to at most `max` characters.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
