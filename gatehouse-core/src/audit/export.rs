//! Audit trail export.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{truncate_chars, AuditEntry, AuditError};

/// Result characters kept per row in CSV exports.
pub const CSV_RESULT_CHARS: usize = 500;

const CSV_HEADER: [&str; 10] = [
    "id",
    "session_id",
    "timestamp",
    "event_type",
    "tool_name",
    "tool_params",
    "result",
    "error",
    "user_decision",
    "execution_time_ms",
];

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unknown export format: {}", other)),
        }
    }
}

/// Render entries in the given format, keeping their order.
///
/// JSON exports carry full entries. CSV rows cut the result to
/// [`CSV_RESULT_CHARS`] and write params as compact JSON.
pub fn export_entries(entries: &[AuditEntry], format: ExportFormat) -> Result<String, AuditError> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(entries)?),
        ExportFormat::Csv => Ok(to_csv(entries)),
    }
}

fn to_csv(entries: &[AuditEntry]) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_HEADER.iter().map(|h| h.to_string()));

    for entry in entries {
        push_row(
            &mut out,
            [
                entry.id.clone(),
                entry.session_id.clone(),
                entry.timestamp.to_rfc3339(),
                entry.event_type.to_string(),
                entry.tool_name.clone().unwrap_or_default(),
                entry
                    .params
                    .as_ref()
                    .map(|p| p.to_string())
                    .unwrap_or_default(),
                entry
                    .result
                    .as_deref()
                    .map(|r| truncate_chars(r, CSV_RESULT_CHARS))
                    .unwrap_or_default(),
                entry.error.clone().unwrap_or_default(),
                entry.user_decision.clone().unwrap_or_default(),
                entry
                    .execution_time_ms
                    .map(|ms| ms.to_string())
                    .unwrap_or_default(),
            ],
        );
    }
    out
}

fn push_row(out: &mut String, fields: impl IntoIterator<Item = String>) {
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape_field(&field));
    }
    out.push_str("\r\n");
}

// RFC 4180 quoting
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
