use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::RiskLevel;

/// Events emitted by an orchestrator run.
///
/// Serialized with a `type` tag, e.g. `{"type":"tool_result","tool":"file_read",...}`.
/// A run always ends with [`Event::Done`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Text from the model
    Text { content: String },

    /// A call needs a human decision
    ToolRequest {
        tool: String,
        params: Value,
        description: String,
        risk_level: RiskLevel,
        approval_id: String,
    },

    /// A call ran successfully
    ToolResult {
        tool: String,
        result: Value,
        #[serde(rename = "execution_time_ms")]
        duration_ms: u64,
    },

    /// A call could not run or failed while running
    ToolError { tool: String, error: String },

    /// A call hit a block
    ToolBlocked { tool: String, message: String },

    /// The user declined a call, or nobody answered in time
    ToolRejected { tool: String },

    Warning { message: String },

    /// The model call failed; the run stops
    Error { message: String },

    Done,
}

impl Event {
    /// The `type` tag of this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::Text { .. } => "text",
            Event::ToolRequest { .. } => "tool_request",
            Event::ToolResult { .. } => "tool_result",
            Event::ToolError { .. } => "tool_error",
            Event::ToolBlocked { .. } => "tool_blocked",
            Event::ToolRejected { .. } => "tool_rejected",
            Event::Warning { .. } => "warning",
            Event::Error { .. } => "error",
            Event::Done => "done",
        }
    }

    /// Tool the event is about, if any.
    pub fn tool(&self) -> Option<&str> {
        match self {
            Event::ToolRequest { tool, .. }
            | Event::ToolResult { tool, .. }
            | Event::ToolError { tool, .. }
            | Event::ToolBlocked { tool, .. }
            | Event::ToolRejected { tool } => Some(tool),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Event::Done)
    }
}
