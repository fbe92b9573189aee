//! Application state for the gatehouse server.

use std::sync::Arc;

use gatehouse_core::{AgentProfile, ApprovalBroker, Orchestrator};

/// Shared application state.
///
/// Cloned for each request handler. The broker is the approval handler of
/// every run started over HTTP, so `/approve` can reach the waiting run.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub broker: ApprovalBroker,
    pub profiles: Arc<Vec<AgentProfile>>,
}

impl AppState {
    /// Look up an agent profile by name, ignoring case.
    pub fn profile(&self, name: &str) -> Option<&AgentProfile> {
        self.profiles
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}
