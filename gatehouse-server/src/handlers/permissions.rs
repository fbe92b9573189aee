//! Permission inspection, revocation and block endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use gatehouse_core::PermissionKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PermissionsResponse {
    pub session_id: String,
    pub grants: Vec<PermissionKey>,
    /// Global blocks, shared by every session.
    pub blocked: Vec<PermissionKey>,
}

#[derive(Debug, Serialize)]
pub struct RevokeResponse {
    pub status: &'static str,
    pub session_id: String,
    pub revoked: bool,
}

/// Request body for revoking a single grant.
#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    pub session_id: String,
    pub tool: String,
    /// Exact parameters of the grant. Without them the tool-wide grant is revoked.
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct RevokeGrantResponse {
    pub status: &'static str,
    pub session_id: String,
    pub tool: String,
    pub revoked: bool,
}

#[derive(Debug, Deserialize)]
pub struct BlockRequest {
    pub tool: String,
}

/// Request body for lifting a block.
#[derive(Debug, Deserialize)]
pub struct UnblockRequest {
    pub tool: String,
    /// Exact parameters of the block. Without them the tool-wide block is lifted.
    #[serde(default)]
    pub params: Option<Value>,
}

/// Reply to block and unblock requests.
#[derive(Debug, Serialize)]
pub struct BlockResponse {
    pub status: &'static str,
    pub tool: String,
}

pub async fn get_permissions_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<PermissionsResponse> {
    let permissions = state.orchestrator.permissions();
    Json(PermissionsResponse {
        grants: permissions.session_permissions(&session_id),
        blocked: permissions.blocked(),
        session_id,
    })
}

/// Drop every grant of a session and record the revocation.
pub async fn revoke_permissions_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ServerResult<Json<RevokeResponse>> {
    let revoked = state.orchestrator.revoke_session(&session_id).await?;

    Ok(Json(RevokeResponse {
        status: "ok",
        session_id,
        revoked,
    }))
}

/// Revoke one grant of a session. The revocation is audited even when no
/// grant matched.
pub async fn revoke_handler(
    State(state): State<AppState>,
    Json(request): Json<RevokeRequest>,
) -> ServerResult<Json<RevokeGrantResponse>> {
    require_tool(&request.tool)?;
    if request.session_id.trim().is_empty() {
        return Err(ServerError::InvalidRequest(
            "session_id must not be empty".to_string(),
        ));
    }

    let revoked = state
        .orchestrator
        .revoke_permission(&request.session_id, &request.tool, request.params.as_ref())
        .await?;

    Ok(Json(RevokeGrantResponse {
        status: "revoked",
        session_id: request.session_id,
        tool: request.tool,
        revoked,
    }))
}

pub async fn block_handler(
    State(state): State<AppState>,
    Json(request): Json<BlockRequest>,
) -> ServerResult<Json<BlockResponse>> {
    require_tool(&request.tool)?;
    state.orchestrator.block_tool(&request.tool)?;

    Ok(Json(BlockResponse {
        status: "blocked",
        tool: request.tool,
    }))
}

pub async fn unblock_handler(
    State(state): State<AppState>,
    Json(request): Json<UnblockRequest>,
) -> ServerResult<Json<BlockResponse>> {
    require_tool(&request.tool)?;
    state
        .orchestrator
        .unblock(&request.tool, request.params.as_ref())?;

    Ok(Json(BlockResponse {
        status: "ok",
        tool: request.tool,
    }))
}

fn require_tool(tool: &str) -> ServerResult<()> {
    if tool.trim().is_empty() {
        return Err(ServerError::InvalidRequest("tool must not be empty".to_string()));
    }
    Ok(())
}
