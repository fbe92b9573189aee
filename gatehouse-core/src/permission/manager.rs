//! Process-wide permission state.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::grant::{PermissionKey, PermissionScope};
use crate::registry::RiskLevel;

/// A tool call waiting for a human decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingApproval {
    pub approval_id: String,
    pub session_id: String,
    pub tool: String,
    pub params: Value,
    pub description: String,
    pub risk_level: RiskLevel,
    pub created_at: DateTime<Utc>,
}

/// Session grants, global blocks and pending approvals.
///
/// One instance is shared by every orchestrator run in the process. Each
/// map sits behind its own lock and no lock is held across an await.
///
/// # Example
///
/// ```rust
/// use gatehouse_core::permission::{PermissionManager, PermissionScope};
/// use serde_json::json;
///
/// let permissions = PermissionManager::new();
/// let params = json!({"query": "rust"});
///
/// assert!(!permissions.check_permission("s1", "web_search", &params));
/// permissions.grant_permission("s1", "web_search", &params, PermissionScope::Session);
///
/// // Session grants cover every parameter combination
/// assert!(permissions.check_permission("s1", "web_search", &json!({"query": "go"})));
/// // but only for the session that granted them
/// assert!(!permissions.check_permission("s2", "web_search", &params));
/// ```
#[derive(Debug, Default)]
pub struct PermissionManager {
    session_grants: RwLock<HashMap<String, HashSet<PermissionKey>>>,
    blocked: RwLock<HashSet<PermissionKey>>,
    pending: Mutex<HashMap<String, PendingApproval>>,
}

impl PermissionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a call may run without asking.
    ///
    /// Blocks win over grants. Both are matched on the exact key and on the
    /// tool-wide key.
    pub fn check_permission(&self, session_id: &str, tool: &str, params: &Value) -> bool {
        let exact = PermissionKey::exact(tool, params);
        let tool_wide = PermissionKey::tool(tool);

        {
            let blocked = self.blocked.read();
            if blocked.contains(&exact) || blocked.contains(&tool_wide) {
                return false;
            }
        }

        self.session_grants
            .read()
            .get(session_id)
            .map(|grants| grants.contains(&exact) || grants.contains(&tool_wide))
            .unwrap_or(false)
    }

    /// Record a user's decision.
    ///
    /// `Never` blocks the exact parameter combination for every session.
    /// `Session` grants the whole tool and `Once` grants the exact
    /// combination, both for this session only. `Once` grants are not
    /// consumed by use.
    pub fn grant_permission(
        &self,
        session_id: &str,
        tool: &str,
        params: &Value,
        scope: PermissionScope,
    ) {
        let key = match scope {
            PermissionScope::Never => {
                let key = PermissionKey::exact(tool, params);
                tracing::info!(tool, key = %key.fingerprint(), "blocking tool call");
                self.blocked.write().insert(key);
                return;
            }
            PermissionScope::Session => PermissionKey::tool(tool),
            PermissionScope::Once => PermissionKey::exact(tool, params),
        };

        tracing::info!(
            session_id,
            tool,
            scope = %scope,
            key = %key.fingerprint(),
            "granting permission"
        );
        self.session_grants
            .write()
            .entry(session_id.to_string())
            .or_default()
            .insert(key);
    }

    /// Remove one grant from a session.
    ///
    /// With `params` the exact grant is removed, otherwise the tool-wide one.
    /// Returns `true` if a grant was removed.
    pub fn revoke_permission(&self, session_id: &str, tool: &str, params: Option<&Value>) -> bool {
        let key = key_for(tool, params);
        let removed = self
            .session_grants
            .write()
            .get_mut(session_id)
            .map(|grants| grants.remove(&key))
            .unwrap_or(false);

        if removed {
            tracing::info!(session_id, tool, key = %key.fingerprint(), "revoked permission");
        }
        removed
    }

    /// Drop every grant of a session. Returns `true` if the session had any.
    pub fn revoke_session(&self, session_id: &str) -> bool {
        let removed = self.session_grants.write().remove(session_id).is_some();
        if removed {
            tracing::info!(session_id, "revoked all session permissions");
        }
        removed
    }

    pub fn is_blocked(&self, tool: &str, params: &Value) -> bool {
        let blocked = self.blocked.read();
        blocked.contains(&PermissionKey::exact(tool, params))
            || blocked.contains(&PermissionKey::tool(tool))
    }

    /// Block every invocation of a tool.
    pub fn block_tool(&self, tool: &str) {
        tracing::info!(tool, "blocking tool");
        self.blocked.write().insert(PermissionKey::tool(tool));
    }

    /// Lift a block. Returns `true` if a block was removed.
    pub fn unblock(&self, tool: &str, params: Option<&Value>) -> bool {
        let key = key_for(tool, params);
        let removed = self.blocked.write().remove(&key);
        if removed {
            tracing::info!(tool, key = %key.fingerprint(), "unblocked");
        }
        removed
    }

    /// Park a call awaiting a human decision and return its approval id.
    pub fn create_approval_request(
        &self,
        session_id: &str,
        tool: &str,
        params: &Value,
        description: &str,
        risk_level: RiskLevel,
    ) -> String {
        let approval_id = uuid::Uuid::new_v4().simple().to_string();
        let pending = PendingApproval {
            approval_id: approval_id.clone(),
            session_id: session_id.to_string(),
            tool: tool.to_string(),
            params: params.clone(),
            description: description.to_string(),
            risk_level,
            created_at: Utc::now(),
        };

        self.pending.lock().insert(approval_id.clone(), pending);
        tracing::debug!(session_id, tool, approval_id = %approval_id, "approval requested");
        approval_id
    }

    pub fn get_pending_approval(&self, approval_id: &str) -> Option<PendingApproval> {
        self.pending.lock().get(approval_id).cloned()
    }

    /// Remove and return a pending approval. A second call returns `None`.
    pub fn resolve_approval(&self, approval_id: &str) -> Option<PendingApproval> {
        self.pending.lock().remove(approval_id)
    }

    /// Pending approvals, oldest first, optionally limited to one session.
    pub fn pending_approvals(&self, session_id: Option<&str>) -> Vec<PendingApproval> {
        let mut pending: Vec<_> = self
            .pending
            .lock()
            .values()
            .filter(|p| session_id.map_or(true, |s| p.session_id == s))
            .cloned()
            .collect();
        pending.sort_by_key(|p| p.created_at);
        pending
    }

    /// Grants held by a session, sorted.
    pub fn session_permissions(&self, session_id: &str) -> Vec<PermissionKey> {
        let mut keys: Vec<_> = self
            .session_grants
            .read()
            .get(session_id)
            .map(|grants| grants.iter().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Every active block, sorted.
    pub fn blocked(&self) -> Vec<PermissionKey> {
        let mut keys: Vec<_> = self.blocked.read().iter().cloned().collect();
        keys.sort();
        keys
    }
}

fn key_for(tool: &str, params: Option<&Value>) -> PermissionKey {
    match params {
        Some(params) => PermissionKey::exact(tool, params),
        None => PermissionKey::tool(tool),
    }
}
