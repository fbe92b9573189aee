//! HTTP handlers.

pub(crate) mod approvals;
pub(crate) mod audit;
pub(crate) mod chat;
pub(crate) mod permissions;
pub(crate) mod tools;
