//! HTTP transport for the gatehouse policy engine.
//!
//! Streams orchestrator events to clients as server-sent events and exposes
//! the approval, permission and audit services over plain JSON endpoints.
//! Approvals travel out of band: a run emits `tool_request` on the chat
//! stream, the client answers with `POST /approve/:approval_id`, and the
//! shared [`ApprovalBroker`](gatehouse_core::ApprovalBroker) wakes the run.
//!
//! # Example
//!
//! ```rust,no_run
//! use gatehouse_core::{ApprovalBroker, Orchestrator};
//! use gatehouse_server::GatehouseRouter;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let orchestrator: Orchestrator = todo!();
//! let broker = orchestrator.config().approval_broker();
//! let app = GatehouseRouter::new(orchestrator, broker).build();
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub(crate) mod handlers;
pub mod router;
pub(crate) mod state;

// Re-exports
pub use error::{BuildError, ServerError, ServerResult};
pub use handlers::approvals::Decision;
pub use handlers::chat::SESSION_HEADER;
pub use router::GatehouseRouter;
