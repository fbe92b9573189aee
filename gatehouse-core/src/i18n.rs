//! User-facing messages produced by the orchestrator.
//!
//! Only the messages a human might read are localized: denial texts in
//! events and the assistant notes that explain a denial. Notes about tool
//! results stay in English since they are addressed to the model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported message languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    De,
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::En => f.write_str("en"),
            Locale::De => f.write_str("de"),
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "de" => Ok(Locale::De),
            other => Err(format!("unsupported locale: {}", other)),
        }
    }
}

/// A localizable orchestrator message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message<'a> {
    /// `tool_error` text when the agent profile excludes a tool.
    AgentNoAccess { agent: &'a str, tool: &'a str },
    /// Note appended when the agent profile excludes a tool.
    ToolNotAllowed { tool: &'a str },
    /// `tool_error` text when a tool is above the agent's risk ceiling.
    RiskExceeded {
        agent: &'a str,
        tool: &'a str,
        max: &'a str,
    },
    /// `tool_blocked` event text.
    ToolBlocked,
    /// Note appended when a call hits a block.
    ToolBlockedNote { tool: &'a str },
    /// Note appended when the user declines a call.
    UserRejected { tool: &'a str },
}

impl Message<'_> {
    pub fn render(&self, locale: Locale) -> String {
        match (locale, *self) {
            (Locale::En, Message::AgentNoAccess { agent, tool }) => {
                format!("Agent '{}' does not have access to {}", agent, tool)
            }
            (Locale::De, Message::AgentNoAccess { agent, tool }) => {
                format!("Agent '{}' hat keinen Zugriff auf {}", agent, tool)
            }
            (Locale::En, Message::ToolNotAllowed { tool }) => {
                format!("Tool {} is not allowed for this agent.", tool)
            }
            (Locale::De, Message::ToolNotAllowed { tool }) => {
                format!("Tool {} ist fuer diesen Agent nicht erlaubt.", tool)
            }
            (Locale::En, Message::RiskExceeded { agent, tool, max }) => format!(
                "Tool {} exceeds the maximum risk level '{}' of agent '{}'",
                tool, max, agent
            ),
            (Locale::De, Message::RiskExceeded { agent, tool, max }) => format!(
                "Tool {} ueberschreitet die maximale Risikostufe '{}' von Agent '{}'",
                tool, max, agent
            ),
            (Locale::En, Message::ToolBlocked) => "Tool was blocked by the user".to_string(),
            (Locale::De, Message::ToolBlocked) => "Tool wurde vom Benutzer blockiert".to_string(),
            (Locale::En, Message::ToolBlockedNote { tool }) => {
                format!("Tool {} was blocked.", tool)
            }
            (Locale::De, Message::ToolBlockedNote { tool }) => {
                format!("Tool {} wurde blockiert.", tool)
            }
            (Locale::En, Message::UserRejected { tool }) => format!("User rejected {}.", tool),
            (Locale::De, Message::UserRejected { tool }) => {
                format!("Benutzer hat {} abgelehnt.", tool)
            }
        }
    }
}
