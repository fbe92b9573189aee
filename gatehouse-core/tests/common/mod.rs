//! Common test utilities shared across test files.
//!
//! Items here may not be used by all test files, hence the module-level allow.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
pub use gatehouse_core::test_utils::{event_types, MockModel};
use gatehouse_core::{
    ApprovalHandler, ApprovalRequest, AuditEntry, AuditEventType, AuditQuery, AuditSink,
    ChatMessage, MemoryAuditSink, ModelResponse, Orchestrator, OrchestratorBuilder,
    PermissionScope, ToolError, ToolHandlers,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

// ===== Model =====

/// A mock model that finishes with empty text once its script is used up,
/// so a run ends with `done` after the scripted turns.
pub fn scripted() -> MockModel {
    MockModel::new().with_fallback(ModelResponse::text(""))
}

// ===== Approval handlers =====

/// Answers approval requests from a queue and records what was asked.
///
/// An empty queue answers `None`.
#[derive(Clone, Default)]
pub struct ScriptedApprovals {
    decisions: Arc<Mutex<VecDeque<Option<PermissionScope>>>>,
    requests: Arc<Mutex<Vec<ApprovalRequest>>>,
}

impl ScriptedApprovals {
    pub fn new<I>(decisions: I) -> Self
    where
        I: IntoIterator<Item = Option<PermissionScope>>,
    {
        Self {
            decisions: Arc::new(Mutex::new(decisions.into_iter().collect())),
            requests: Arc::default(),
        }
    }

    pub fn requests(&self) -> Vec<ApprovalRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl ApprovalHandler for ScriptedApprovals {
    async fn request_approval(&self, request: ApprovalRequest) -> Option<PermissionScope> {
        self.requests.lock().push(request);
        self.decisions.lock().pop_front().flatten()
    }
}

/// Never answers.
pub struct Silent;

#[async_trait]
impl ApprovalHandler for Silent {
    async fn request_approval(&self, _request: ApprovalRequest) -> Option<PermissionScope> {
        std::future::pending::<Option<PermissionScope>>().await
    }
}

// ===== Tools =====

/// Handlers for the built-in catalog.
///
/// `shell_execute` misbehaves on purpose depending on its command:
/// `fail` is an expected failure, `crash` an unexpected one, `panic`
/// panics and `sleep` outlasts short timeouts.
pub fn handlers() -> ToolHandlers {
    ToolHandlers::new()
        .handler("file_read", |params: Value, _ctx| async move {
            let path = params["path"].as_str().unwrap_or_default().to_string();
            Ok(json!(format!("contents of {}", path)))
        })
        .handler("file_write", |params: Value, _ctx| async move {
            Ok(json!({"written": params["filename"]}))
        })
        .handler("file_list", |_params: Value, _ctx| async move {
            Ok(json!(["a.txt", "b.txt"]))
        })
        .handler("web_search", |params: Value, _ctx| async move {
            Ok(json!({"query": params["query"], "results": []}))
        })
        .handler("web_fetch", |params: Value, _ctx| async move {
            Ok(json!({"url": params["url"], "status": 200}))
        })
        .handler("shell_execute", |params: Value, _ctx| async move {
            match params["command"].as_str().unwrap_or_default() {
                "fail" => Err(ToolError::failed("Command not in whitelist: fail")),
                "crash" => Err(ToolError::Unexpected("connection reset".to_string())),
                "panic" => panic!("shell exploded"),
                "sleep" => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(json!("woke up"))
                }
                other => Ok(json!(format!("ran {}", other))),
            }
        })
        .handler("memory_save", |_params: Value, _ctx| async move {
            Ok(json!({"saved": true}))
        })
        .handler("memory_search", |_params: Value, _ctx| async move {
            Ok(json!({"memories": []}))
        })
}

// ===== Orchestrator setup =====

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub model: MockModel,
    pub audit: Arc<MemoryAuditSink>,
}

pub fn harness(model: MockModel) -> Harness {
    harness_with(model, |b| b)
}

pub fn harness_with(
    model: MockModel,
    configure: impl FnOnce(OrchestratorBuilder) -> OrchestratorBuilder,
) -> Harness {
    let audit = Arc::new(MemoryAuditSink::new());
    let builder = Orchestrator::builder()
        .model(model.clone())
        .executor(handlers())
        .audit_arc(audit.clone());
    let orchestrator = configure(builder).build().unwrap();

    Harness {
        orchestrator,
        model,
        audit,
    }
}

impl Harness {
    pub async fn audit_types(&self, session_id: &str) -> Vec<AuditEventType> {
        self.audit_entries(session_id)
            .await
            .iter()
            .map(|e| e.event_type)
            .collect()
    }

    /// Entries of a session, oldest first.
    pub async fn audit_entries(&self, session_id: &str) -> Vec<AuditEntry> {
        let mut entries = self
            .audit
            .query(&AuditQuery::session(session_id).with_limit(1000))
            .await
            .unwrap();
        entries.reverse();
        entries
    }
}

pub fn user(text: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::user(text)]
}
