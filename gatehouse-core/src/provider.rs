//! Language model abstraction.
//!
//! The orchestrator only needs one call from a model backend: given the
//! conversation so far and the tools on offer, return some text and/or a
//! list of tool calls. Wire formats of concrete providers live behind
//! [`ChatModel`] implementations.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::ToolSchema;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parameters: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, parameters: Value) -> Self {
        Self {
            id: format!("call_{}", uuid::Uuid::new_v4().simple()),
            name: name.into(),
            parameters,
        }
    }
}

/// Result of one model round-trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

impl ModelResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls: calls,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Text content, if present and not blank.
    pub fn text_content(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Error types for model providers
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Authentication or authorization failed (expired tokens, invalid credentials, etc.)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting or throttling
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Network or connectivity issues
    #[error("Network error: {0}")]
    Network(String),

    /// Model-specific errors (content filtered, context too long, etc.)
    #[error("Model error: {0}")]
    Model(String),

    /// Service unavailable or temporary issues
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Invalid configuration (bad model ID, missing parameters, etc.)
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Other provider-specific errors that don't fit above categories
    #[error("{0}")]
    Other(String),
}

/// A chat model with function calling.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Model name for logs.
    fn name(&self) -> &str;

    /// Run one round-trip.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> Result<ModelResponse, ProviderError>;
}

#[async_trait::async_trait]
impl ChatModel for Arc<dyn ChatModel> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> Result<ModelResponse, ProviderError> {
        (**self).chat(messages, tools).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_constructors() {
        assert_eq!(ChatMessage::user("hi").role, Role::User);
        assert_eq!(ChatMessage::assistant("ok").role, Role::Assistant);
        assert_eq!(ChatMessage::system("be nice").content, "be nice");
    }

    #[test]
    fn test_message_serde() {
        let msg: ChatMessage =
            serde_json::from_value(json!({"role": "user", "content": "Hello"})).unwrap();
        assert_eq!(msg, ChatMessage::user("Hello"));
        assert_eq!(
            serde_json::to_value(ChatMessage::assistant("x")).unwrap(),
            json!({"role": "assistant", "content": "x"})
        );
    }

    #[test]
    fn test_text_content_ignores_blank() {
        assert_eq!(ModelResponse::text("hi").text_content(), Some("hi"));
        assert_eq!(ModelResponse::text("   ").text_content(), None);
        assert_eq!(ModelResponse::default().text_content(), None);
    }

    #[test]
    fn test_tool_call_ids_unique() {
        let a = ToolCall::new("x", json!({}));
        let b = ToolCall::new("x", json!({}));
        assert_ne!(a.id, b.id);
        assert!(ModelResponse::tool_calls(vec![a]).has_tool_calls());
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::RateLimited("slow down".into());
        assert_eq!(err.to_string(), "Rate limited: slow down");
    }
}
