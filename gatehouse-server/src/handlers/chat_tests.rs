//! Tests for chat request parsing.

use super::*;
use gatehouse_core::Role;

#[test]
fn test_chat_request_all_fields() {
    let json = r#"{
        "session_id": "s-123",
        "messages": [
            {"role": "system", "content": "Be brief"},
            {"role": "user", "content": "Hello"}
        ],
        "agent": "Research",
        "max_iterations": 3
    }"#;

    let request: ChatRequest = serde_json::from_str(json).unwrap();
    assert_eq!(request.session_id.as_deref(), Some("s-123"));
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role, Role::System);
    assert_eq!(request.agent.as_deref(), Some("Research"));
    assert_eq!(request.max_iterations, Some(3));
}

#[test]
fn test_chat_request_minimal() {
    let json = r#"{"messages": [{"role": "user", "content": "Hi"}]}"#;
    let request: ChatRequest = serde_json::from_str(json).unwrap();

    assert!(request.session_id.is_none());
    assert!(request.agent.is_none());
    assert!(request.max_iterations.is_none());
}

#[test]
fn test_chat_request_requires_messages() {
    let json = r#"{"session_id": "s1"}"#;
    assert!(serde_json::from_str::<ChatRequest>(json).is_err());
}

#[test]
fn test_chat_request_rejects_unknown_role() {
    let json = r#"{"messages": [{"role": "tool", "content": "x"}]}"#;
    assert!(serde_json::from_str::<ChatRequest>(json).is_err());
}
