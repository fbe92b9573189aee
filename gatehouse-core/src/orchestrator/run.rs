//! One conversation run: the model round-trip loop.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::approval::ApprovalHandler;
use crate::audit::{AuditError, AuditRecord};
use crate::events::Event;
use crate::profile::AgentProfile;
use crate::provider::{ChatMessage, Role};

use super::{Orchestrator, RunOptions};

/// The consumer dropped the event stream.
#[derive(Debug)]
pub(super) struct Cancelled;

pub(super) struct Run {
    pub(super) orchestrator: Orchestrator,
    pub(super) session_id: String,
    pub(super) messages: Vec<ChatMessage>,
    pub(super) approval: Arc<dyn ApprovalHandler>,
    pub(super) agent: Option<AgentProfile>,
    max_iterations: usize,
    pub(super) tx: mpsc::Sender<Event>,
}

impl Run {
    pub(super) fn new(
        orchestrator: Orchestrator,
        session_id: String,
        mut messages: Vec<ChatMessage>,
        approval: Arc<dyn ApprovalHandler>,
        options: RunOptions,
        tx: mpsc::Sender<Event>,
    ) -> Self {
        let max_iterations = options
            .max_iterations
            .unwrap_or(orchestrator.config.max_iterations);

        if let Some(prompt) = options.agent.as_ref().and_then(|a| a.system_prompt.as_ref()) {
            if messages.first().map_or(true, |m| m.role != Role::System) {
                messages.insert(0, ChatMessage::system(prompt.clone()));
            }
        }

        Self {
            orchestrator,
            session_id,
            messages,
            approval,
            agent: options.agent,
            max_iterations,
            tx,
        }
    }

    pub(super) async fn run(mut self) {
        tracing::debug!(
            session_id = %self.session_id,
            agent = self.agent.as_ref().map(|a| a.name.as_str()),
            max_iterations = self.max_iterations,
            "run started"
        );

        if self.drive().await.is_err() {
            tracing::debug!(session_id = %self.session_id, "event consumer went away, run stopped");
        }
    }

    async fn drive(&mut self) -> Result<(), Cancelled> {
        for iteration in 1..=self.max_iterations {
            tracing::debug!(session_id = %self.session_id, iteration, "calling model");

            let tools = self.orchestrator.registry.export_for_model();
            let response = tokio::select! {
                response = self.orchestrator.model.chat(&self.messages, &tools) => response,
                _ = self.tx.closed() => return Err(Cancelled),
            };

            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(
                        session_id = %self.session_id,
                        iteration,
                        model = self.orchestrator.model.name(),
                        error = %e,
                        "model call failed"
                    );
                    self.emit(Event::Error {
                        message: e.to_string(),
                    })
                    .await?;
                    return self.emit(Event::Done).await;
                }
            };

            if !response.has_tool_calls() {
                if let Some(text) = response.text_content() {
                    self.emit(Event::Text {
                        content: text.to_string(),
                    })
                    .await?;
                }
                return self.emit(Event::Done).await;
            }

            for call in &response.tool_calls {
                self.handle_tool_call(call).await?;
            }

            if let Some(text) = response.text_content() {
                self.emit(Event::Text {
                    content: text.to_string(),
                })
                .await?;
            }
        }

        tracing::warn!(
            session_id = %self.session_id,
            max_iterations = self.max_iterations,
            "maximum tool iterations reached"
        );
        self.emit(Event::Warning {
            message: "Maximum tool iterations reached".to_string(),
        })
        .await?;
        self.emit(Event::Done).await
    }

    pub(super) async fn emit(&self, event: Event) -> Result<(), Cancelled> {
        self.tx.send(event).await.map_err(|_| Cancelled)
    }

    /// Append an assistant note for the next round-trip.
    pub(super) fn note(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    /// Best-effort audit write bounded by the configured timeout.
    pub(super) async fn audit(&self, record: AuditRecord) {
        let event_type = record.event_type;
        let limit = self.orchestrator.config.audit_timeout();
        let result = tokio::time::timeout(limit, self.orchestrator.audit.record(record))
            .await
            .unwrap_or(Err(AuditError::Timeout));

        if let Err(e) = result {
            tracing::warn!(
                session_id = %self.session_id,
                event_type = %event_type,
                error = %e,
                "audit write failed"
            );
        }
    }
}
