//! Tests for the router builder.

use crate::error::BuildError;
use crate::router::GatehouseRouter;
use gatehouse_core::test_utils::{MockModel, RecordingExecutor};
use gatehouse_core::{AgentProfile, ApprovalBroker, Orchestrator};

fn orchestrator() -> Orchestrator {
    Orchestrator::builder()
        .model(MockModel::new())
        .executor(RecordingExecutor::new())
        .build()
        .unwrap()
}

#[test]
fn test_build_nested_rejects_bad_prefix() {
    let err = GatehouseRouter::new(orchestrator(), ApprovalBroker::new())
        .build_nested("policy")
        .unwrap_err();
    assert!(matches!(err, BuildError::InvalidPrefix(p) if p == "policy"));

    let err = GatehouseRouter::new(orchestrator(), ApprovalBroker::new())
        .build_nested("/")
        .unwrap_err();
    assert!(matches!(err, BuildError::InvalidPrefix(_)));
}

#[test]
fn test_build_nested_accepts_prefix() {
    let result = GatehouseRouter::new(orchestrator(), ApprovalBroker::new())
        .with_profiles([AgentProfile::new("Only")])
        .build_nested("/policy");
    assert!(result.is_ok());
}
