//! Permission system for tool calls.
//!
//! # Overview
//!
//! - **[`PermissionManager`]**: session grants, global blocks and pending approvals
//! - **[`PermissionKey`]**: what a grant or block applies to (exact params or whole tool)
//! - **[`PermissionScope`]**: the user's decision (`once`, `session`, `never`)
//! - **[`PendingApproval`]**: a call parked until a human decides
//!
//! # Scopes
//!
//! | Scope | Stored as | Matches |
//! |-------|-----------|---------|
//! | `once` | exact key, per session | Only the same parameters, for the rest of the session |
//! | `session` | tool key, per session | Any invocation of the tool in that session |
//! | `never` | exact key, global | Blocks the same parameters in every session |

mod grant;
mod manager;

pub use grant::{canonical_params, PermissionKey, PermissionScope};
pub use manager::{PendingApproval, PermissionManager};
