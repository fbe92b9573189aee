//! The conversation loop.
//!
//! [`Orchestrator::process_message`] drives a bounded number of model
//! round-trips. Every tool call the model asks for passes through the
//! policy pipeline in order:
//!
//! 1. unknown tools and tools the agent profile excludes are refused
//! 2. the request is audited
//! 3. auto-approved or already granted calls run immediately
//! 4. blocked calls are refused
//! 5. anything else waits for a human decision through the approval handler
//!
//! Outcomes are reported as [`Event`]s on the returned stream and as short
//! assistant notes appended to the history for the next round-trip.

mod admin;
mod builder;
mod run;
mod tools;

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::approval::ApprovalHandler;
use crate::audit::AuditSink;
use crate::config::OrchestratorConfig;
use crate::events::Event;
use crate::executor::{Resources, ToolExecutor};
use crate::permission::PermissionManager;
use crate::profile::AgentProfile;
use crate::provider::{ChatMessage, ChatModel};
use crate::registry::ToolRegistry;

pub use builder::{BuildError, OrchestratorBuilder};

use run::Run;

/// Coordinates the model, the policy services and tool execution.
///
/// Cloning is cheap: every service is shared. One orchestrator serves any
/// number of concurrent runs.
///
/// # Example
///
/// ```rust
/// use gatehouse_core::{ApprovalRequest, Orchestrator, PermissionScope};
/// use gatehouse_core::executor::ToolHandlers;
/// use gatehouse_core::provider::{ChatMessage, ChatModel, ModelResponse, ProviderError};
/// use gatehouse_core::registry::ToolSchema;
/// use futures::StreamExt;
///
/// struct Hello;
///
/// #[async_trait::async_trait]
/// impl ChatModel for Hello {
///     fn name(&self) -> &str { "hello" }
///     async fn chat(&self, _: &[ChatMessage], _: &[ToolSchema]) -> Result<ModelResponse, ProviderError> {
///         Ok(ModelResponse::text("Hello!"))
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let orchestrator = Orchestrator::builder()
///     .model(Hello)
///     .executor(ToolHandlers::new())
///     .build()
///     .unwrap();
///
/// let events: Vec<_> = orchestrator
///     .process_message("s1", vec![ChatMessage::user("Hi")], |_: ApprovalRequest| async {
///         None::<PermissionScope>
///     })
///     .collect()
///     .await;
/// assert_eq!(events.len(), 2);
/// # });
/// ```
#[derive(Clone)]
pub struct Orchestrator {
    pub(crate) model: Arc<dyn ChatModel>,
    pub(crate) executor: Arc<dyn ToolExecutor>,
    pub(crate) registry: Arc<ToolRegistry>,
    pub(crate) permissions: Arc<PermissionManager>,
    pub(crate) audit: Arc<dyn AuditSink>,
    pub(crate) resources: Arc<Resources>,
    pub(crate) config: OrchestratorConfig,
}

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Overrides the configured maximum number of round-trips.
    pub max_iterations: Option<usize>,
    /// Restricts the run to what this profile allows.
    pub agent: Option<AgentProfile>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    pub fn with_agent(mut self, agent: AgentProfile) -> Self {
        self.agent = Some(agent);
        self
    }
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn permissions(&self) -> &Arc<PermissionManager> {
        &self.permissions
    }

    pub fn audit(&self) -> &Arc<dyn AuditSink> {
        &self.audit
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Run the loop with default options.
    ///
    /// See [`process_message_with`](Self::process_message_with).
    pub fn process_message(
        &self,
        session_id: impl Into<String>,
        messages: Vec<ChatMessage>,
        on_approval_needed: impl ApprovalHandler + 'static,
    ) -> EventStream {
        self.process_message_with(session_id, messages, on_approval_needed, RunOptions::default())
    }

    /// Start a run and return its event stream.
    ///
    /// The run executes on a spawned task, so this must be called from
    /// within a Tokio runtime. The stream ends after [`Event::Done`].
    /// Dropping the stream stops the run at its next step; a call waiting
    /// for approval is then recorded as rejected and its pending entry
    /// removed.
    pub fn process_message_with(
        &self,
        session_id: impl Into<String>,
        messages: Vec<ChatMessage>,
        on_approval_needed: impl ApprovalHandler + 'static,
        options: RunOptions,
    ) -> EventStream {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let run = Run::new(
            self.clone(),
            session_id.into(),
            messages,
            Arc::new(on_approval_needed),
            options,
            tx,
        );
        tokio::spawn(run.run());
        EventStream::new(rx)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("model", &self.model.name())
            .field("tools", &self.registry.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Ordered events of one run.
pub struct EventStream {
    inner: ReceiverStream<Event>,
}

impl EventStream {
    fn new(rx: mpsc::Receiver<Event>) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
        }
    }

    /// Wait for the next event.
    pub async fn recv(&mut self) -> Option<Event> {
        self.inner.as_mut().recv().await
    }

    /// Drain the stream until the run finishes.
    pub async fn collect_all(mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(event) = self.recv().await {
            events.push(event);
        }
        events
    }
}

impl Stream for EventStream {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
