//! Policy administration outside of a run.
//!
//! These are the operations an operator performs between conversations:
//! revoking grants, placing and lifting blocks and exporting the trail.
//! Revocations are audited like decisions made inside a run.

use serde_json::Value;

use crate::audit::{export_entries, AuditEventType, AuditQuery, AuditRecord, ExportFormat};
use crate::error::{Error, Result};

use super::Orchestrator;

impl Orchestrator {
    /// Revoke one grant of a session and record the revocation.
    ///
    /// With `params` only the exact-parameter grant is removed, otherwise
    /// the tool-wide grant. Returns whether a grant existed; the revocation
    /// is recorded either way.
    pub async fn revoke_permission(
        &self,
        session_id: &str,
        tool: &str,
        params: Option<&Value>,
    ) -> Result<bool> {
        let revoked = self.permissions.revoke_permission(session_id, tool, params);

        let mut record = AuditRecord::new(session_id, AuditEventType::PermissionRevoked);
        record.tool_name = Some(tool.to_string());
        record.params = params.cloned();
        self.audit.record(record).await?;

        tracing::info!(session_id, tool, exact = params.is_some(), revoked, "permission revoked");
        Ok(revoked)
    }

    /// Revoke every grant of a session and record the revocation.
    pub async fn revoke_session(&self, session_id: &str) -> Result<bool> {
        let revoked = self.permissions.revoke_session(session_id);

        self.audit
            .record(AuditRecord::new(session_id, AuditEventType::PermissionRevoked))
            .await?;

        tracing::info!(session_id, revoked, "session permissions revoked");
        Ok(revoked)
    }

    /// Block a registered tool for every session and every parameter set.
    pub fn block_tool(&self, tool: &str) -> Result<()> {
        if !self.registry.contains(tool) {
            return Err(Error::UnknownTool(tool.to_string()));
        }
        self.permissions.block_tool(tool);
        tracing::info!(tool, "tool blocked");
        Ok(())
    }

    /// Lift a block. `params` selects an exact-parameter block.
    pub fn unblock(&self, tool: &str, params: Option<&Value>) -> Result<()> {
        if !self.permissions.unblock(tool, params) {
            return Err(Error::NoSuchPermission(format!("no block for tool {}", tool)));
        }
        tracing::info!(tool, exact = params.is_some(), "block lifted");
        Ok(())
    }

    /// Render the entries matching `query`, newest first.
    pub async fn export_audit(&self, query: &AuditQuery, format: ExportFormat) -> Result<String> {
        let entries = self.audit.query(query).await?;
        Ok(export_entries(&entries, format)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::audit::{AuditSink, MemoryAuditSink};
    use crate::permission::PermissionScope;
    use crate::test_utils::{MockModel, RecordingExecutor};

    use super::*;

    fn orchestrator() -> (Orchestrator, Arc<MemoryAuditSink>) {
        let audit = Arc::new(MemoryAuditSink::new());
        let orchestrator = Orchestrator::builder()
            .model(MockModel::new())
            .executor(RecordingExecutor::new())
            .audit_arc(audit.clone())
            .build()
            .unwrap();
        (orchestrator, audit)
    }

    #[tokio::test]
    async fn test_revoke_permission_is_audited() {
        let (orch, audit) = orchestrator();
        let params = json!({"path": "/tmp/a"});
        orch.permissions()
            .grant_permission("s1", "file_read", &params, PermissionScope::Once);

        assert!(orch
            .revoke_permission("s1", "file_read", Some(&params))
            .await
            .unwrap());
        assert!(!orch.permissions().check_permission("s1", "file_read", &params));

        // Nothing left to revoke, still recorded
        assert!(!orch
            .revoke_permission("s1", "file_read", Some(&params))
            .await
            .unwrap());

        let entries = audit.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event_type, AuditEventType::PermissionRevoked);
        assert_eq!(entries[0].tool_name.as_deref(), Some("file_read"));
        assert_eq!(entries[0].params, Some(params));
    }

    #[tokio::test]
    async fn test_revoke_session() {
        let (orch, audit) = orchestrator();
        orch.permissions()
            .grant_permission("s1", "web_fetch", &json!({}), PermissionScope::Session);

        assert!(orch.revoke_session("s1").await.unwrap());
        assert!(orch.permissions().session_permissions("s1").is_empty());
        assert_eq!(audit.len(), 1);
    }

    #[test]
    fn test_block_and_unblock() {
        let (orch, _) = orchestrator();

        let err = orch.block_tool("teleport").unwrap_err();
        assert!(matches!(err, Error::UnknownTool(ref t) if t == "teleport"));

        orch.block_tool("shell_execute").unwrap();
        assert!(orch
            .permissions()
            .is_blocked("shell_execute", &json!({"command": "ls"})));

        orch.unblock("shell_execute", None).unwrap();
        assert!(!orch.permissions().is_blocked("shell_execute", &json!({})));
        assert!(orch.unblock("shell_execute", None).unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_export_audit() {
        let (orch, audit) = orchestrator();
        audit
            .record(AuditRecord::new("s1", AuditEventType::ToolRequested).tool("file_read", &json!({})))
            .await
            .unwrap();
        audit
            .record(AuditRecord::new("s2", AuditEventType::ToolRequested).tool("web_search", &json!({})))
            .await
            .unwrap();

        let csv = orch
            .export_audit(&AuditQuery::session("s1"), ExportFormat::Csv)
            .await
            .unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains("file_read"));
        assert!(!csv.contains("web_search"));
    }
}
