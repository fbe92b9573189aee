//! Audit trail endpoints.

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use gatehouse_core::{AuditEntry, AuditQuery, AuditStats, ExportFormat};
use serde::Deserialize;

use crate::error::ServerResult;
use crate::state::AppState;

/// Upper bound on entries returned by one query.
const MAX_QUERY_LIMIT: usize = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Filtered audit entries, newest first.
pub async fn query_audit_handler(
    State(state): State<AppState>,
    Query(mut query): Query<AuditQuery>,
) -> ServerResult<Json<Vec<AuditEntry>>> {
    query.limit = query.limit.min(MAX_QUERY_LIMIT);
    let entries = state.orchestrator.audit().query(&query).await?;
    Ok(Json(entries))
}

pub async fn audit_stats_handler(
    State(state): State<AppState>,
    Query(stats): Query<StatsQuery>,
) -> ServerResult<Json<AuditStats>> {
    let query = AuditQuery {
        session_id: stats.session_id,
        limit: usize::MAX,
        ..AuditQuery::default()
    };
    let entries = state.orchestrator.audit().query(&query).await?;
    Ok(Json(AuditStats::from_entries(&entries)))
}

/// Download the whole trail, or one session of it, as CSV or JSON.
pub async fn export_audit_handler(
    State(state): State<AppState>,
    Query(export): Query<ExportQuery>,
) -> ServerResult<impl IntoResponse> {
    let query = AuditQuery {
        session_id: export.session_id,
        limit: usize::MAX,
        ..AuditQuery::default()
    };
    let body = state.orchestrator.export_audit(&query, export.format).await?;

    let disposition = format!(
        "attachment; filename=audit_log.{}",
        export.format.extension()
    );
    Ok((
        [
            (header::CONTENT_TYPE, export.format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}
