//! # Gatehouse
//!
//! A policy engine that sits between an LLM and the tools it wants to call.
//!
//! Every tool call the model asks for is checked against a tool catalog and
//! an optional agent profile, recorded in an audit trail, and either run
//! straight away (auto-approved or previously granted), refused (blocked),
//! or held until a human decides.
//!
//! ## Quick Start
//!
//! ```ignore
//! use gatehouse_core::{ApprovalRequest, ChatMessage, Orchestrator, PermissionScope, ToolHandlers};
//! use serde_json::json;
//!
//! # async fn example(model: impl gatehouse_core::ChatModel + 'static) -> gatehouse_core::Result<()> {
//! let tools = ToolHandlers::new()
//!     .handler("web_search", |params: serde_json::Value, _ctx| async move {
//!         Ok(json!({"results": [], "query": params["query"]}))
//!     });
//!
//! let orchestrator = Orchestrator::builder()
//!     .model(model)
//!     .executor(tools)
//!     .build()?;
//!
//! let mut events = orchestrator.process_message(
//!     "session-1",
//!     vec![ChatMessage::user("Find the Rust release notes")],
//!     |request: ApprovalRequest| async move {
//!         println!("approve {}? ({})", request.tool, request.risk_level);
//!         Some(PermissionScope::Once)
//!     },
//! );
//!
//! while let Some(event) = events.recv().await {
//!     println!("{}", serde_json::to_string(&event).unwrap());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Permission scopes
//!
//! | Decision  | Effect                                                   |
//! |-----------|----------------------------------------------------------|
//! | `once`    | this tool with these exact parameters, for the session   |
//! | `session` | this tool with any parameters, for the session           |
//! | `never`   | this tool with these exact parameters, blocked globally  |
//! | rejection | nothing is remembered                                    |
//!
//! ## Modules
//!
//! - [`registry`]: tool catalog with risk levels and JSON schemas
//! - [`permission`]: grants, blocks and pending approvals
//! - [`audit`]: audit sinks, queries and statistics
//! - [`profile`]: agent profiles restricting tools and risk
//! - [`orchestrator`]: the conversation loop, its event stream and policy
//!   administration (revocation, blocks, audit export)
//! - [`approval`]: approval handlers, including a broker for HTTP transports

pub mod approval;
pub mod audit;
pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod i18n;
pub mod orchestrator;
pub mod permission;
pub mod profile;
pub mod provider;
pub mod registry;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use approval::{
    ApprovalBroker, ApprovalError, ApprovalHandler, ApprovalRequest, DEFAULT_APPROVAL_TIMEOUT,
};
pub use audit::{
    export_entries, AuditEntry, AuditError, AuditEventType, AuditQuery, AuditRecord, AuditSink,
    AuditStats, ExportFormat, FileAuditSink, MemoryAuditSink, MAX_AUDIT_RESULT_CHARS,
};
pub use config::OrchestratorConfig;
pub use error::{Error, Result};
pub use events::Event;
pub use executor::{ExecutionContext, Resources, ToolError, ToolExecutor, ToolHandlers};
pub use i18n::Locale;
pub use orchestrator::{BuildError, EventStream, Orchestrator, OrchestratorBuilder, RunOptions};
pub use permission::{
    canonical_params, PendingApproval, PermissionKey, PermissionManager, PermissionScope,
};
pub use profile::AgentProfile;
pub use provider::{ChatMessage, ChatModel, ModelResponse, ProviderError, Role, ToolCall};
pub use registry::{
    builtin_tools, ParamSpec, ParamType, RiskLevel, ToolDefinition, ToolRegistry, ToolSchema,
};
