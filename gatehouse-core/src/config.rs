//! Orchestrator settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::approval::ApprovalBroker;
use crate::i18n::Locale;

/// Default cap on model round-trips per run.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Default number of result characters echoed back into the history.
pub const DEFAULT_HISTORY_RESULT_CHARS: usize = 500;

/// Tunables for orchestrator runs.
///
/// Deserializes from any serde format; missing fields take their defaults.
///
/// ```rust
/// use gatehouse_core::config::OrchestratorConfig;
///
/// let config: OrchestratorConfig =
///     serde_json::from_str(r#"{"max_iterations": 3, "locale": "de"}"#).unwrap();
/// assert_eq!(config.max_iterations, 3);
/// assert_eq!(config.approval_timeout_secs, 120);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Model round-trips before a run gives up with a warning.
    pub max_iterations: usize,
    /// Characters of a tool result kept in the assistant note.
    pub history_result_chars: usize,
    /// Wait for a human decision, used by [`OrchestratorConfig::approval_broker`].
    pub approval_timeout_secs: u64,
    /// Upper bound on a single audit write.
    pub audit_timeout_ms: u64,
    /// Upper bound on a single tool execution. `None` waits indefinitely.
    pub tool_timeout_ms: Option<u64>,
    /// Language of user-facing messages.
    pub locale: Locale,
    /// Buffered events per run before the producer waits for the consumer.
    pub channel_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            history_result_chars: DEFAULT_HISTORY_RESULT_CHARS,
            approval_timeout_secs: 120,
            audit_timeout_ms: 5_000,
            tool_timeout_ms: None,
            locale: Locale::default(),
            channel_capacity: 64,
        }
    }
}

impl OrchestratorConfig {
    pub fn approval_timeout(&self) -> Duration {
        Duration::from_secs(self.approval_timeout_secs)
    }

    pub fn audit_timeout(&self) -> Duration {
        Duration::from_millis(self.audit_timeout_ms)
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_ms.map(Duration::from_millis)
    }

    /// A broker that waits [`approval_timeout`](Self::approval_timeout) for decisions.
    pub fn approval_broker(&self) -> ApprovalBroker {
        ApprovalBroker::with_timeout(self.approval_timeout())
    }

    /// Check values that would make a run misbehave.
    pub fn validate(&self) -> Result<(), String> {
        if self.channel_capacity == 0 {
            return Err("channel_capacity must be at least 1".to_string());
        }
        if self.audit_timeout_ms == 0 {
            return Err("audit_timeout_ms must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.history_result_chars, 500);
        assert_eq!(config.approval_timeout(), Duration::from_secs(120));
        assert_eq!(config.tool_timeout(), None);
        assert_eq!(config.locale, Locale::En);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_deserialize() {
        let config: OrchestratorConfig =
            serde_json::from_str(r#"{"tool_timeout_ms": 30000, "locale": "de"}"#).unwrap();
        assert_eq!(config.tool_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.locale, Locale::De);
        assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
    }

    #[test]
    fn test_validate() {
        let config = OrchestratorConfig {
            channel_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_broker_uses_timeout() {
        let config = OrchestratorConfig {
            approval_timeout_secs: 7,
            ..Default::default()
        };
        assert_eq!(config.approval_broker().timeout(), Duration::from_secs(7));
    }
}
