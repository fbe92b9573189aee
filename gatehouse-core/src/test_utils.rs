//! Test utilities for gatehouse-core.
//!
//! Scripted doubles for the model and the tool executor, so orchestrator
//! runs can be exercised without a real LLM backend.
//!
//! Enable with the `test-utils` feature:
//!
//! ```toml
//! [dev-dependencies]
//! gatehouse-core = { version = "...", features = ["test-utils"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use gatehouse_core::test_utils::{event_types, MockModel, RecordingExecutor};
//! use gatehouse_core::{ApprovalRequest, ChatMessage, Orchestrator, PermissionScope};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let model = MockModel::new()
//!     .with_tool_call("web_search", json!({"query": "rust"}))
//!     .with_text("Found it.");
//!
//! let orchestrator = Orchestrator::builder()
//!     .model(model)
//!     .executor(RecordingExecutor::new())
//!     .build()
//!     .unwrap();
//!
//! let events = orchestrator
//!     .process_message("s1", vec![ChatMessage::user("search")], |_: ApprovalRequest| async {
//!         None::<PermissionScope>
//!     })
//!     .collect_all()
//!     .await;
//!
//! assert_eq!(event_types(&events), vec!["tool_result", "text", "done"]);
//! # });
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::events::Event;
use crate::executor::{ExecutionContext, ToolError, ToolExecutor};
use crate::provider::{ChatMessage, ChatModel, ModelResponse, ProviderError, ToolCall};
use crate::registry::ToolSchema;

#[derive(Clone)]
enum Scripted {
    Response(ModelResponse),
    Error(String),
}

/// A chat model that replays pre-programmed responses in order.
///
/// Once the script is used up it repeats the fallback response if one is
/// set, otherwise every further call fails.
///
/// ```ignore
/// use gatehouse_core::test_utils::MockModel;
/// use serde_json::json;
///
/// // Tool call followed by a final answer
/// let model = MockModel::new()
///     .with_tool_call("file_read", json!({"path": "/tmp/a"}))
///     .with_text("Done");
///
/// // Never stops asking for tools
/// let looping = MockModel::new().repeat_tool_call("web_search", json!({"query": "x"}));
/// ```
#[derive(Clone, Default)]
pub struct MockModel {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    fallback: Option<ModelResponse>,
    requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a plain text answer.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_response(ModelResponse::text(text))
    }

    /// Queue a response with a single tool call.
    pub fn with_tool_call(self, tool: impl Into<String>, params: Value) -> Self {
        self.with_response(ModelResponse::tool_calls(vec![ToolCall::new(tool, params)]))
    }

    /// Queue a response with several tool calls.
    pub fn with_tool_calls<I, S>(self, calls: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let calls = calls
            .into_iter()
            .map(|(tool, params)| ToolCall::new(tool, params))
            .collect();
        self.with_response(ModelResponse::tool_calls(calls))
    }

    pub fn with_response(self, response: ModelResponse) -> Self {
        self.script.lock().push_back(Scripted::Response(response));
        self
    }

    /// Queue a failed round-trip.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.script.lock().push_back(Scripted::Error(message.into()));
        self
    }

    /// Answer every call after the script with `response`.
    pub fn with_fallback(mut self, response: ModelResponse) -> Self {
        self.fallback = Some(response);
        self
    }

    /// Answer every call after the script with the same tool call.
    pub fn repeat_tool_call(self, tool: impl Into<String>, params: Value) -> Self {
        self.with_fallback(ModelResponse::tool_calls(vec![ToolCall::new(tool, params)]))
    }

    /// Number of round-trips made so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// The history the model saw on each round-trip.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ChatModel for MockModel {
    fn name(&self) -> &str {
        "MockModel"
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolSchema],
    ) -> Result<ModelResponse, ProviderError> {
        self.requests.lock().push(messages.to_vec());

        let next = self.script.lock().pop_front();
        match next {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Error(message)) => Err(ProviderError::Model(message)),
            None => self.fallback.clone().ok_or_else(|| {
                ProviderError::Other("MockModel: No more responses configured".to_string())
            }),
        }
    }
}

/// One call seen by [`RecordingExecutor`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub tool: String,
    pub params: Value,
    pub session_id: String,
    pub agent: Option<String>,
}

/// A tool executor that records every call and returns canned results.
///
/// Tools without a configured outcome succeed with
/// `{"tool": <name>, "status": "ok"}`.
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    outcomes: Arc<Mutex<HashMap<String, Result<Value, String>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(self, tool: impl Into<String>, result: Value) -> Self {
        self.outcomes.lock().insert(tool.into(), Ok(result));
        self
    }

    /// Make a tool fail with an expected error.
    pub fn with_failure(self, tool: impl Into<String>, message: impl Into<String>) -> Self {
        self.outcomes.lock().insert(tool.into(), Err(message.into()));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Names of executed tools, in order.
    pub fn executed_tools(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.tool.clone()).collect()
    }
}

#[async_trait]
impl ToolExecutor for RecordingExecutor {
    async fn execute(
        &self,
        tool: &str,
        params: Value,
        context: &ExecutionContext,
    ) -> Result<Value, ToolError> {
        self.calls.lock().push(RecordedCall {
            tool: tool.to_string(),
            params,
            session_id: context.session_id.clone(),
            agent: context.agent.clone(),
        });

        let outcome = self.outcomes.lock().get(tool).cloned();
        match outcome {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(ToolError::Failed(message)),
            None => Ok(json!({"tool": tool, "status": "ok"})),
        }
    }
}

/// The `type` tags of a run's events, in order.
pub fn event_types(events: &[Event]) -> Vec<&'static str> {
    events.iter().map(Event::event_type).collect()
}
