//! Router builder for gatehouse HTTP endpoints.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use gatehouse_core::{AgentProfile, ApprovalBroker, Orchestrator};
use tower_http::trace::TraceLayer;

use crate::error::BuildError;
use crate::handlers::{approvals, audit, chat, permissions, tools};
use crate::state::AppState;

/// Builder for the gatehouse HTTP endpoints.
///
/// | Method | Path | Purpose |
/// |--------|------|---------|
/// | POST | `/chat` | run a chat turn, events as SSE |
/// | POST | `/approve/:approval_id` | answer a pending approval (`?decision=` or JSON body) |
/// | GET | `/approvals` | list pending approvals |
/// | GET | `/tools` | list registered tools |
/// | GET | `/tools/:name` | one tool with risk level and approval flag |
/// | GET, DELETE | `/permissions/:session_id` | inspect or revoke session grants |
/// | POST | `/revoke` | revoke a single grant |
/// | POST | `/block` | block a tool for every session |
/// | POST | `/unblock` | lift a block |
/// | GET | `/audit` | query the audit trail |
/// | GET | `/audit/stats` | aggregate audit numbers |
/// | GET | `/audit/export` | download the trail as CSV or JSON |
///
/// # Example
///
/// ```rust,no_run
/// use gatehouse_core::{ApprovalBroker, Orchestrator};
/// use gatehouse_server::GatehouseRouter;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let orchestrator: Orchestrator = todo!();
/// let app = GatehouseRouter::new(orchestrator, ApprovalBroker::new()).build();
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub struct GatehouseRouter {
    orchestrator: Orchestrator,
    broker: ApprovalBroker,
    profiles: Vec<AgentProfile>,
}

impl GatehouseRouter {
    /// Create a router builder serving the default agent profiles.
    ///
    /// The broker answers every approval request of runs started over
    /// HTTP; its timeout bounds how long a run waits for `/approve`.
    pub fn new(orchestrator: Orchestrator, broker: ApprovalBroker) -> Self {
        Self {
            orchestrator,
            broker,
            profiles: AgentProfile::defaults(),
        }
    }

    /// Replace the agent profiles selectable through the `agent` field of `/chat`.
    pub fn with_profiles(mut self, profiles: impl IntoIterator<Item = AgentProfile>) -> Self {
        self.profiles = profiles.into_iter().collect();
        self
    }

    /// Build the router with all endpoints.
    ///
    /// Returns an axum `Router` that can be served directly or merged
    /// with other routes.
    pub fn build(self) -> Router {
        let state = AppState {
            orchestrator: self.orchestrator,
            broker: self.broker,
            profiles: Arc::new(self.profiles),
        };

        Router::new()
            .route("/chat", post(chat::chat_handler))
            .route("/approve/:approval_id", post(approvals::approve_handler))
            .route("/approvals", get(approvals::list_approvals_handler))
            .route("/tools", get(tools::list_tools_handler))
            .route("/tools/:name", get(tools::get_tool_handler))
            .route(
                "/permissions/:session_id",
                get(permissions::get_permissions_handler)
                    .delete(permissions::revoke_permissions_handler),
            )
            .route("/revoke", post(permissions::revoke_handler))
            .route("/block", post(permissions::block_handler))
            .route("/unblock", post(permissions::unblock_handler))
            .route("/audit", get(audit::query_audit_handler))
            .route("/audit/stats", get(audit::audit_stats_handler))
            .route("/audit/export", get(audit::export_audit_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Build the router and nest it under a prefix path.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidPrefix`] unless the prefix starts with `/`.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use gatehouse_core::{ApprovalBroker, Orchestrator};
    /// # use gatehouse_server::GatehouseRouter;
    /// # use axum::Router;
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let orchestrator: Orchestrator = todo!();
    /// // Chat lands at /policy/chat
    /// let gatehouse = GatehouseRouter::new(orchestrator, ApprovalBroker::new())
    ///     .build_nested("/policy")?;
    ///
    /// let app = Router::new().merge(gatehouse);
    /// # Ok(())
    /// # }
    /// ```
    pub fn build_nested(self, prefix: impl Into<String>) -> Result<Router, BuildError> {
        let prefix = prefix.into();
        if !prefix.starts_with('/') || prefix.len() < 2 {
            return Err(BuildError::InvalidPrefix(prefix));
        }
        Ok(Router::new().nest(&prefix, self.build()))
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
