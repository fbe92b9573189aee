//! Tool catalog endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use gatehouse_core::ToolDefinition;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Every registered tool in registration order.
pub async fn list_tools_handler(State(state): State<AppState>) -> Json<Vec<ToolDefinition>> {
    Json(state.orchestrator.registry().list().to_vec())
}

/// One tool, including its risk level and whether calls need approval.
pub async fn get_tool_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ServerResult<Json<ToolDefinition>> {
    state
        .orchestrator
        .registry()
        .get(&name)
        .cloned()
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("Unknown tool: {}", name)))
}
