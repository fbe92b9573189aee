//! Agent profiles.
//!
//! A profile narrows what one orchestrator run may do: which tools are
//! visible at all, which run without asking, and the highest risk level
//! the agent may touch.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::registry::RiskLevel;

/// Read-only restriction attached to an orchestrator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Prepended as a system message when the history has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// `None` means every tool is allowed.
    #[serde(default)]
    pub allowed_tools: Option<BTreeSet<String>>,
    /// `None` means nothing is auto-approved.
    #[serde(default)]
    pub auto_approve_tools: Option<BTreeSet<String>>,
    #[serde(default = "default_risk_level_max")]
    pub risk_level_max: RiskLevel,
}

fn default_risk_level_max() -> RiskLevel {
    RiskLevel::High
}

impl AgentProfile {
    /// A profile that allows every tool up to high risk and auto-approves nothing.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            system_prompt: None,
            allowed_tools: None,
            auto_approve_tools: None,
            risk_level_max: default_risk_level_max(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_allowed_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_auto_approve_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auto_approve_tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_risk_level_max(mut self, level: RiskLevel) -> Self {
        self.risk_level_max = level;
        self
    }

    pub fn allows(&self, tool: &str) -> bool {
        self.allowed_tools
            .as_ref()
            .map_or(true, |allowed| allowed.contains(tool))
    }

    pub fn auto_approves(&self, tool: &str) -> bool {
        self.auto_approve_tools
            .as_ref()
            .map_or(false, |auto| auto.contains(tool))
    }

    pub fn permits_risk(&self, level: RiskLevel) -> bool {
        level <= self.risk_level_max
    }

    /// The standard profiles: a general assistant, a research agent and a
    /// system agent.
    pub fn defaults() -> Vec<AgentProfile> {
        vec![
            AgentProfile::new("Assistant").with_description(
                "General assistant with access to all tools. Every action needs approval.",
            ),
            AgentProfile::new("Research")
                .with_description("Web research and information lookup. Web search runs without approval.")
                .with_system_prompt(
                    "You are a research assistant. Use web_search and web_fetch to find \
                     information and summarize the results clearly.",
                )
                .with_allowed_tools([
                    "web_search",
                    "web_fetch",
                    "file_read",
                    "memory_save",
                    "memory_search",
                ])
                .with_auto_approve_tools(["web_search", "memory_search"])
                .with_risk_level_max(RiskLevel::Medium),
            AgentProfile::new("System")
                .with_description("System agent with shell access. Every action needs approval.")
                .with_system_prompt(
                    "You are a system administration assistant. You can run shell commands \
                     and manage files. Always explain what you are about to do first.",
                ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unrestricted_profile() {
        let profile = AgentProfile::new("any");
        assert!(profile.allows("shell_execute"));
        assert!(!profile.auto_approves("web_search"));
        assert!(profile.permits_risk(RiskLevel::High));
        assert!(!profile.permits_risk(RiskLevel::Critical));
    }

    #[test]
    fn test_restricted_profile() {
        let profile = AgentProfile::new("r")
            .with_allowed_tools(["web_search"])
            .with_auto_approve_tools(["web_search"])
            .with_risk_level_max(RiskLevel::Low);

        assert!(profile.allows("web_search"));
        assert!(!profile.allows("shell_execute"));
        assert!(profile.auto_approves("web_search"));
        assert!(!profile.permits_risk(RiskLevel::Medium));
    }

    #[test]
    fn test_defaults() {
        let defaults = AgentProfile::defaults();
        assert_eq!(defaults.len(), 3);

        let research = defaults.iter().find(|p| p.name == "Research").unwrap();
        assert!(!research.allows("shell_execute"));
        assert!(research.auto_approves("memory_search"));
        assert_eq!(research.risk_level_max, RiskLevel::Medium);
    }

    #[test]
    fn test_deserialize_null_sets() {
        let profile: AgentProfile = serde_json::from_value(json!({
            "name": "x",
            "allowed_tools": null,
            "auto_approve_tools": ["a"]
        }))
        .unwrap();

        assert!(profile.allowed_tools.is_none());
        assert!(profile.auto_approves("a"));
        assert_eq!(profile.risk_level_max, RiskLevel::High);
    }
}
