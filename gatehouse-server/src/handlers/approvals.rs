//! Approval endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use gatehouse_core::{PendingApproval, PermissionScope};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// A human decision on a pending tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Once,
    Session,
    Never,
    Reject,
}

impl Decision {
    /// The scope handed to the waiting run. `None` rejects the call.
    pub fn scope(self) -> Option<PermissionScope> {
        match self {
            Decision::Once => Some(PermissionScope::Once),
            Decision::Session => Some(PermissionScope::Session),
            Decision::Never => Some(PermissionScope::Never),
            Decision::Reject => None,
        }
    }
}

/// Request body for answering an approval.
#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub decision: Decision,
}

/// `?decision=` form of [`ApproveRequest`]. Takes precedence over a body.
#[derive(Debug, Default, Deserialize)]
pub struct ApproveQuery {
    #[serde(default)]
    pub decision: Option<Decision>,
}

#[derive(Debug, Serialize)]
pub struct ApproveResponse {
    pub status: &'static str,
    pub approval_id: String,
    pub decision: Decision,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApprovalsQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Deliver a decision to the run waiting on `approval_id`.
///
/// The decision comes from `?decision=` or a JSON body.
pub async fn approve_handler(
    State(state): State<AppState>,
    Path(approval_id): Path<String>,
    Query(query): Query<ApproveQuery>,
    body: Option<Json<ApproveRequest>>,
) -> ServerResult<Json<ApproveResponse>> {
    let decision = query
        .decision
        .or(body.map(|Json(request)| request.decision))
        .ok_or_else(|| ServerError::InvalidRequest("decision is required".to_string()))?;

    state.broker.resolve(&approval_id, decision.scope())?;

    tracing::info!(approval_id = %approval_id, decision = ?decision, "approval answered");

    Ok(Json(ApproveResponse {
        status: "ok",
        approval_id,
        decision,
    }))
}

/// List calls waiting for a decision, oldest first.
pub async fn list_approvals_handler(
    State(state): State<AppState>,
    Query(query): Query<ApprovalsQuery>,
) -> Json<Vec<PendingApproval>> {
    Json(
        state
            .orchestrator
            .permissions()
            .pending_approvals(query.session_id.as_deref()),
    )
}

#[cfg(test)]
#[path = "approvals_tests.rs"]
mod tests;
