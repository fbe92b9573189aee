//! Human approval of tool calls.
//!
//! When a call needs consent the orchestrator emits a `tool_request` event
//! and then waits on an [`ApprovalHandler`]. The handler belongs to the
//! transport: it decides how the question reaches a human and how long to
//! wait for the answer.
//!
//! [`ApprovalBroker`] is the usual handler for request/response transports.
//! Each request parks on a one-shot channel until [`ApprovalBroker::resolve`]
//! is called with the approval id, or the timeout elapses.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::permission::PermissionScope;
use crate::registry::RiskLevel;

/// How long the broker waits for a decision before treating it as a rejection.
pub const DEFAULT_APPROVAL_TIMEOUT: Duration = Duration::from_secs(120);

/// The question put to a human.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub approval_id: String,
    pub session_id: String,
    pub tool: String,
    pub params: Value,
    pub description: String,
    pub risk_level: RiskLevel,
}

/// Answers approval requests.
///
/// Returns the scope the user granted, or `None` for a rejection or a
/// timeout. Invoked once per call that needs consent. Implementations must
/// bound their own wait.
///
/// The orchestrator calls [`register`](Self::register) before it emits the
/// `tool_request` event and [`request_approval`](Self::request_approval)
/// after. A decision that arrives in between must not be lost. If the run
/// stops before asking, [`withdraw`](Self::withdraw) is called instead.
#[async_trait]
pub trait ApprovalHandler: Send + Sync {
    fn register(&self, _request: &ApprovalRequest) {}

    fn withdraw(&self, _approval_id: &str) {}

    async fn request_approval(&self, request: ApprovalRequest) -> Option<PermissionScope>;
}

/// Async closures can be used directly as approval handlers.
///
/// ```rust
/// use gatehouse_core::approval::{ApprovalHandler, ApprovalRequest};
/// use gatehouse_core::permission::PermissionScope;
///
/// fn accepts(_handler: impl ApprovalHandler) {}
///
/// accepts(|request: ApprovalRequest| async move {
///     (request.tool == "file_read").then_some(PermissionScope::Once)
/// });
/// ```
#[async_trait]
impl<F, Fut> ApprovalHandler for F
where
    F: Fn(ApprovalRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<PermissionScope>> + Send + 'static,
{
    async fn request_approval(&self, request: ApprovalRequest) -> Option<PermissionScope> {
        self(request).await
    }
}

/// Errors that can occur when resolving an approval
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    /// No request is waiting under this id (unknown, answered or expired)
    #[error("Approval request not found: {0}")]
    NotFound(String),

    /// The waiting run went away before the answer arrived
    #[error("Failed to deliver approval decision: channel closed")]
    ChannelClosed,
}

type Decision = Option<PermissionScope>;

/// One registered approval id.
///
/// `tx` is taken by `resolve`, `rx` by the waiting run. The oneshot keeps a
/// decision sent before the run starts waiting.
struct Slot {
    tx: Option<oneshot::Sender<Decision>>,
    rx: Option<oneshot::Receiver<Decision>>,
}

impl Slot {
    fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            tx: Some(tx),
            rx: Some(rx),
        }
    }
}

type Slots = Mutex<HashMap<String, Slot>>;

/// Approval handler that waits for an out-of-band decision.
///
/// An id can be resolved as soon as it is registered, which happens before
/// the `tool_request` event reaches any client. Cloning is cheap; clones
/// share the same requests.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use gatehouse_core::approval::{ApprovalBroker, ApprovalHandler, ApprovalRequest};
/// use gatehouse_core::permission::PermissionScope;
/// use gatehouse_core::registry::RiskLevel;
///
/// # tokio_test::block_on(async {
/// let broker = ApprovalBroker::with_timeout(Duration::from_secs(5));
/// let request = ApprovalRequest {
///     approval_id: "a1".into(),
///     session_id: "s1".into(),
///     tool: "file_read".into(),
///     params: serde_json::json!({"path": "/tmp/a"}),
///     description: "Read a file".into(),
///     risk_level: RiskLevel::Medium,
/// };
///
/// broker.register(&request);
/// broker.resolve("a1", Some(PermissionScope::Once)).unwrap();
/// assert_eq!(broker.request_approval(request).await, Some(PermissionScope::Once));
/// # });
/// ```
#[derive(Clone)]
pub struct ApprovalBroker {
    slots: Arc<Slots>,
    timeout: Duration,
}

impl ApprovalBroker {
    /// Create a broker with the default 120 second timeout.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_APPROVAL_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Deliver a decision. `None` rejects the call.
    ///
    /// Fails with [`ApprovalError::NotFound`] for ids that were never
    /// registered, were already answered, or expired.
    pub fn resolve(&self, approval_id: &str, decision: Decision) -> Result<(), ApprovalError> {
        let tx = {
            let mut slots = self.slots.lock();
            let slot = slots
                .get_mut(approval_id)
                .ok_or_else(|| ApprovalError::NotFound(approval_id.to_string()))?;
            let tx = slot
                .tx
                .take()
                .ok_or_else(|| ApprovalError::NotFound(approval_id.to_string()))?;
            // The waiting run removes the slot once it holds the receiver
            if slot.rx.is_none() {
                slots.remove(approval_id);
            }
            tx
        };

        tracing::debug!(approval_id, decision = ?decision, "approval resolved");
        tx.send(decision).map_err(|_| ApprovalError::ChannelClosed)
    }

    /// Whether a decision for this id would currently be accepted.
    pub fn is_waiting(&self, approval_id: &str) -> bool {
        self.slots
            .lock()
            .get(approval_id)
            .is_some_and(|slot| slot.tx.is_some())
    }

    /// Ids still waiting for a decision.
    pub fn pending_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self
            .slots
            .lock()
            .iter()
            .filter(|(_, slot)| slot.tx.is_some())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    fn take_receiver(&self, approval_id: &str) -> oneshot::Receiver<Decision> {
        let mut slots = self.slots.lock();
        let registered = slots.get_mut(approval_id).and_then(|slot| slot.rx.take());
        match registered {
            Some(rx) => {
                // Answered before the wait began; the decision sits in the channel
                if slots.get(approval_id).is_some_and(|slot| slot.tx.is_none()) {
                    slots.remove(approval_id);
                }
                rx
            }
            None => {
                let (tx, rx) = oneshot::channel();
                slots.insert(
                    approval_id.to_string(),
                    Slot {
                        tx: Some(tx),
                        rx: None,
                    },
                );
                rx
            }
        }
    }
}

impl Default for ApprovalBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ApprovalBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalBroker")
            .field("waiting", &self.pending_ids().len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Removes a slot when the wait ends, including when the waiting future
/// is dropped.
struct SlotGuard<'a> {
    slots: &'a Slots,
    approval_id: String,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.slots.lock().remove(&self.approval_id);
    }
}

#[async_trait]
impl ApprovalHandler for ApprovalBroker {
    fn register(&self, request: &ApprovalRequest) {
        self.slots
            .lock()
            .insert(request.approval_id.clone(), Slot::new());
    }

    fn withdraw(&self, approval_id: &str) {
        self.slots.lock().remove(approval_id);
    }

    async fn request_approval(&self, request: ApprovalRequest) -> Option<PermissionScope> {
        let rx = self.take_receiver(&request.approval_id);
        let _guard = SlotGuard {
            slots: &self.slots,
            approval_id: request.approval_id.clone(),
        };

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(decision)) => decision,
            Ok(Err(_)) => None,
            Err(_) => {
                tracing::warn!(
                    approval_id = %request.approval_id,
                    tool = %request.tool,
                    timeout_secs = self.timeout.as_secs(),
                    "approval timed out"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(id: &str) -> ApprovalRequest {
        ApprovalRequest {
            approval_id: id.to_string(),
            session_id: "s1".to_string(),
            tool: "file_read".to_string(),
            params: json!({"path": "/tmp/a"}),
            description: "Read a file".to_string(),
            risk_level: RiskLevel::Medium,
        }
    }

    async fn wait_until_waiting(broker: &ApprovalBroker, id: &str) {
        while !broker.is_waiting(id) {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_resolve_delivers_decision() {
        let broker = ApprovalBroker::new();
        let handle = {
            let broker = broker.clone();
            tokio::spawn(async move { broker.request_approval(request("a1")).await })
        };

        wait_until_waiting(&broker, "a1").await;
        assert_eq!(broker.pending_ids(), vec!["a1".to_string()]);
        broker.resolve("a1", Some(PermissionScope::Session)).unwrap();

        assert_eq!(handle.await.unwrap(), Some(PermissionScope::Session));
        assert!(broker.pending_ids().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_reject() {
        let broker = ApprovalBroker::new();
        let handle = {
            let broker = broker.clone();
            tokio::spawn(async move { broker.request_approval(request("a2")).await })
        };

        wait_until_waiting(&broker, "a2").await;
        broker.resolve("a2", None).unwrap();
        assert_eq!(handle.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolve_unknown_id() {
        let broker = ApprovalBroker::new();
        let err = broker.resolve("nope", Some(PermissionScope::Once)).unwrap_err();
        assert!(matches!(err, ApprovalError::NotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn test_timeout_rejects_and_cleans_up() {
        let broker = ApprovalBroker::with_timeout(Duration::from_millis(20));
        let decision = broker.request_approval(request("a3")).await;

        assert_eq!(decision, None);
        assert!(!broker.is_waiting("a3"));
        assert!(broker.resolve("a3", Some(PermissionScope::Once)).is_err());
    }

    #[tokio::test]
    async fn test_dropped_wait_removes_waiter() {
        let broker = ApprovalBroker::new();
        let handle = {
            let broker = broker.clone();
            tokio::spawn(async move { broker.request_approval(request("a4")).await })
        };

        wait_until_waiting(&broker, "a4").await;
        handle.abort();
        let _ = handle.await;

        assert!(!broker.is_waiting("a4"));
    }

    #[tokio::test]
    async fn test_decision_before_wait_is_kept() {
        let broker = ApprovalBroker::new();
        let req = request("a5");

        broker.register(&req);
        assert!(broker.is_waiting("a5"));
        broker.resolve("a5", Some(PermissionScope::Never)).unwrap();

        assert!(!broker.is_waiting("a5"));
        assert!(matches!(
            broker.resolve("a5", Some(PermissionScope::Once)),
            Err(ApprovalError::NotFound(_))
        ));
        assert_eq!(broker.request_approval(req).await, Some(PermissionScope::Never));
        assert!(broker.pending_ids().is_empty());
    }

    #[tokio::test]
    async fn test_registered_then_waiting() {
        let broker = ApprovalBroker::new();
        let req = request("a6");
        broker.register(&req);
        assert_eq!(broker.pending_ids(), vec!["a6".to_string()]);

        let handle = {
            let broker = broker.clone();
            tokio::spawn(async move { broker.request_approval(req).await })
        };
        broker.resolve("a6", Some(PermissionScope::Once)).unwrap();

        assert_eq!(handle.await.unwrap(), Some(PermissionScope::Once));
        assert!(broker.pending_ids().is_empty());
    }

    #[test]
    fn test_withdraw_forgets_registration() {
        let broker = ApprovalBroker::new();
        broker.register(&request("a7"));
        broker.withdraw("a7");

        assert!(!broker.is_waiting("a7"));
        assert!(broker.resolve("a7", None).is_err());
    }

    #[tokio::test]
    async fn test_closure_handler() {
        let handler = |req: ApprovalRequest| async move {
            if req.tool == "file_read" {
                Some(PermissionScope::Once)
            } else {
                None
            }
        };

        assert_eq!(
            handler.request_approval(request("x")).await,
            Some(PermissionScope::Once)
        );
    }
}
