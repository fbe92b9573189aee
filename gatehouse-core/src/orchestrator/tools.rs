//! Per-call policy pipeline and tool execution.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::approval::{ApprovalHandler, ApprovalRequest};
use crate::audit::{truncate_chars, AuditEventType, AuditRecord};
use crate::events::Event;
use crate::executor::{ExecutionContext, ToolError};
use crate::i18n::Message;
use crate::permission::{PermissionManager, PermissionScope};
use crate::provider::ToolCall;
use crate::registry::ToolDefinition;

use super::run::{Cancelled, Run};

/// Drops the pending approval entry and the handler's registration when
/// the wait ends, however it ends.
struct PendingGuard {
    permissions: Arc<PermissionManager>,
    approval: Arc<dyn ApprovalHandler>,
    approval_id: String,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.permissions.resolve_approval(&self.approval_id);
        self.approval.withdraw(&self.approval_id);
    }
}

impl Run {
    pub(super) async fn handle_tool_call(&mut self, call: &ToolCall) -> Result<(), Cancelled> {
        let locale = self.orchestrator.config.locale;
        let tool = call.name.as_str();
        let params = &call.parameters;

        let Some(def) = self.orchestrator.registry.get(tool).cloned() else {
            tracing::warn!(session_id = %self.session_id, tool, "model requested unknown tool");
            self.emit(Event::ToolError {
                tool: tool.to_string(),
                error: format!("Unknown tool: {}", tool),
            })
            .await?;
            self.note(format!("Tool {} is not available.", tool));
            return Ok(());
        };

        if let Some(agent) = self.agent.clone() {
            if !agent.allows(tool) {
                tracing::info!(session_id = %self.session_id, agent = %agent.name, tool, "tool outside agent profile");
                let error = Message::AgentNoAccess {
                    agent: &agent.name,
                    tool,
                }
                .render(locale);
                self.emit(Event::ToolError {
                    tool: tool.to_string(),
                    error,
                })
                .await?;
                self.note(Message::ToolNotAllowed { tool }.render(locale));
                return Ok(());
            }

            if !agent.permits_risk(def.risk_level) {
                tracing::info!(
                    session_id = %self.session_id,
                    agent = %agent.name,
                    tool,
                    risk_level = %def.risk_level,
                    "tool above agent risk ceiling"
                );
                let message = Message::RiskExceeded {
                    agent: &agent.name,
                    tool,
                    max: agent.risk_level_max.as_str(),
                }
                .render(locale);
                self.emit(Event::ToolError {
                    tool: tool.to_string(),
                    error: message.clone(),
                })
                .await?;
                self.note(message);
                return Ok(());
            }
        }

        self.audit(AuditRecord::new(&self.session_id, AuditEventType::ToolRequested).tool(tool, params))
            .await;

        let auto_approved = !def.requires_approval
            || self.agent.as_ref().is_some_and(|a| a.auto_approves(tool));
        if auto_approved
            || self
                .orchestrator
                .permissions
                .check_permission(&self.session_id, tool, params)
        {
            tracing::debug!(session_id = %self.session_id, tool, auto_approved, "tool call permitted");
            return self.execute(&def, params.clone()).await;
        }

        if self.orchestrator.permissions.is_blocked(tool, params) {
            tracing::info!(session_id = %self.session_id, tool, "tool call blocked");
            self.audit(
                AuditRecord::new(&self.session_id, AuditEventType::ToolRejected)
                    .tool(tool, params)
                    .decision("blocked"),
            )
            .await;
            self.emit(Event::ToolBlocked {
                tool: tool.to_string(),
                message: Message::ToolBlocked.render(locale),
            })
            .await?;
            self.note(Message::ToolBlockedNote { tool }.render(locale));
            return Ok(());
        }

        let decision = match self.request_approval(&def, params).await {
            Ok(decision) => decision,
            Err(Cancelled) => {
                self.audit(
                    AuditRecord::new(&self.session_id, AuditEventType::ToolRejected)
                        .tool(tool, params)
                        .decision("cancelled"),
                )
                .await;
                return Err(Cancelled);
            }
        };

        match decision {
            None => {
                self.audit(
                    AuditRecord::new(&self.session_id, AuditEventType::ToolRejected)
                        .tool(tool, params)
                        .decision("rejected"),
                )
                .await;
                self.emit(Event::ToolRejected {
                    tool: tool.to_string(),
                })
                .await?;
                self.note(Message::UserRejected { tool }.render(locale));
                Ok(())
            }
            Some(PermissionScope::Never) => {
                self.orchestrator.permissions.grant_permission(
                    &self.session_id,
                    tool,
                    params,
                    PermissionScope::Never,
                );
                self.audit(
                    AuditRecord::new(&self.session_id, AuditEventType::ToolRejected)
                        .tool(tool, params)
                        .decision(PermissionScope::Never.as_str()),
                )
                .await;
                self.emit(Event::ToolRejected {
                    tool: tool.to_string(),
                })
                .await?;
                self.note(Message::UserRejected { tool }.render(locale));
                Ok(())
            }
            Some(scope) => {
                self.orchestrator
                    .permissions
                    .grant_permission(&self.session_id, tool, params, scope);
                self.audit(
                    AuditRecord::new(&self.session_id, AuditEventType::ToolApproved)
                        .tool(tool, params)
                        .decision(scope.as_str()),
                )
                .await;
                self.execute(&def, params.clone()).await
            }
        }
    }

    /// Emit a `tool_request` and wait for the handler, or for the consumer
    /// to go away.
    async fn request_approval(
        &self,
        def: &ToolDefinition,
        params: &Value,
    ) -> Result<Option<PermissionScope>, Cancelled> {
        let description = def
            .localized_description(self.orchestrator.config.locale)
            .to_string();
        let approval_id = self.orchestrator.permissions.create_approval_request(
            &self.session_id,
            &def.name,
            params,
            &description,
            def.risk_level,
        );
        let request = ApprovalRequest {
            approval_id: approval_id.clone(),
            session_id: self.session_id.clone(),
            tool: def.name.clone(),
            params: params.clone(),
            description: description.clone(),
            risk_level: def.risk_level,
        };

        // Decisions may arrive as soon as the event is out
        self.approval.register(&request);
        let _pending = PendingGuard {
            permissions: self.orchestrator.permissions.clone(),
            approval: self.approval.clone(),
            approval_id: approval_id.clone(),
        };

        self.emit(Event::ToolRequest {
            tool: def.name.clone(),
            params: params.clone(),
            description,
            risk_level: def.risk_level,
            approval_id,
        })
        .await?;

        tokio::select! {
            decision = self.approval.request_approval(request) => {
                tracing::info!(session_id = %self.session_id, tool = %def.name, decision = ?decision, "approval decided");
                Ok(decision)
            }
            _ = self.tx.closed() => Err(Cancelled),
        }
    }

    /// Run the tool and report the outcome.
    ///
    /// Execution happens on its own task so a panicking tool is reported as
    /// a failure instead of taking the run down with it.
    async fn execute(&mut self, def: &ToolDefinition, params: Value) -> Result<(), Cancelled> {
        let tool = def.name.clone();
        let context = ExecutionContext {
            session_id: self.session_id.clone(),
            agent: self.agent.as_ref().map(|a| a.name.clone()),
            resources: self.orchestrator.resources.clone(),
        };

        let started = Instant::now();
        let outcome = {
            let executor = self.orchestrator.executor.clone();
            let name = tool.clone();
            let task_params = params.clone();
            let handle =
                tokio::spawn(async move { executor.execute(&name, task_params, &context).await });
            let abort = handle.abort_handle();

            let joined = match self.orchestrator.config.tool_timeout() {
                Some(limit) => match tokio::time::timeout(limit, handle).await {
                    Ok(joined) => Some(joined),
                    Err(_) => {
                        abort.abort();
                        None
                    }
                },
                None => Some(handle.await),
            };

            match joined {
                None => Err(ToolError::Timeout(
                    self.orchestrator.config.tool_timeout_ms.unwrap_or_default(),
                )),
                Some(Ok(result)) => result,
                Some(Err(e)) if e.is_panic() => Err(ToolError::Panicked(panic_message(e.into_panic()))),
                Some(Err(e)) => Err(ToolError::Unexpected(e.to_string())),
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(result) => {
                let text = match &result {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                tracing::info!(session_id = %self.session_id, tool = %tool, duration_ms, "tool executed");

                self.audit(
                    AuditRecord::new(&self.session_id, AuditEventType::ToolExecuted)
                        .tool(&tool, &params)
                        .result(text.clone())
                        .duration_ms(duration_ms),
                )
                .await;
                self.note(format!(
                    "Tool {} executed. Result: {}",
                    tool,
                    truncate_chars(&text, self.orchestrator.config.history_result_chars)
                ));
                self.emit(Event::ToolResult {
                    tool,
                    result,
                    duration_ms,
                })
                .await
            }
            Err(e) => {
                if e.is_expected() {
                    tracing::warn!(session_id = %self.session_id, tool = %tool, error = %e, "tool failed");
                } else {
                    tracing::error!(session_id = %self.session_id, tool = %tool, error = %e, "tool failed unexpectedly");
                }

                let message = e.user_message();
                self.audit(
                    AuditRecord::new(&self.session_id, AuditEventType::ToolFailed)
                        .tool(&tool, &params)
                        .error(e.to_string())
                        .duration_ms(duration_ms),
                )
                .await;
                self.note(format!("Tool {} failed: {}", tool, message));
                self.emit(Event::ToolError {
                    tool,
                    error: message,
                })
                .await
            }
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}
