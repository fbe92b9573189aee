//! Crate-level error type.
//!
//! Each module reports its own error enum. [`Error`] wraps them for the
//! orchestrator's administrative surface, where one call can touch the
//! registry, the permission state and the audit trail.

use thiserror::Error;

use crate::approval::ApprovalError;
use crate::audit::AuditError;
use crate::executor::ToolError;
use crate::orchestrator::BuildError;
use crate::provider::ProviderError;

#[derive(Debug, Error)]
pub enum Error {
    /// The tool is not in the registry
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Nothing matched the grant or block the caller named
    #[error("No matching permission: {0}")]
    NoSuchPermission(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error(transparent)]
    Approval(#[from] ApprovalError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

impl Error {
    /// The model backend rejected the credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Provider(ProviderError::Authentication(_)))
    }

    /// The referenced tool, permission or approval does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UnknownTool(_) | Self::NoSuchPermission(_) | Self::Approval(ApprovalError::NotFound(_))
        )
    }

    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Build(_) | Self::Provider(ProviderError::Configuration(_))
        )
    }

    pub fn is_audit(&self) -> bool {
        matches!(self, Self::Audit(_))
    }

    /// Whether trying again later can succeed.
    ///
    /// Throttling, connectivity and a slow audit sink are transient. A tool
    /// timeout is retryable; other tool failures are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Provider(
                ProviderError::RateLimited(_)
                    | ProviderError::Network(_)
                    | ProviderError::ServiceUnavailable(_)
            ) | Self::Audit(AuditError::Timeout)
                | Self::Tool(ToolError::Timeout(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(Error::from(ProviderError::RateLimited("slow down".into())).is_retryable());
        assert!(Error::from(ProviderError::ServiceUnavailable("503".into())).is_retryable());
        assert!(Error::from(AuditError::Timeout).is_retryable());
        assert!(Error::from(ToolError::Timeout(500)).is_retryable());

        assert!(!Error::from(ProviderError::Authentication("expired".into())).is_retryable());
        assert!(!Error::from(ToolError::failed("no such file")).is_retryable());
        assert!(!Error::UnknownTool("x".into()).is_retryable());
    }

    #[test]
    fn test_categories() {
        assert!(Error::from(ProviderError::Authentication("expired".into())).is_auth());
        assert!(Error::from(BuildError::MissingModel).is_config());
        assert!(Error::from(ProviderError::Configuration("no key".into())).is_config());
        assert!(Error::from(AuditError::Timeout).is_audit());

        assert!(Error::UnknownTool("x".into()).is_not_found());
        assert!(Error::NoSuchPermission("x".into()).is_not_found());
        assert!(Error::from(ApprovalError::NotFound("abc".into())).is_not_found());
        assert!(!Error::from(ApprovalError::ChannelClosed).is_not_found());
    }

    #[test]
    fn test_display_is_transparent() {
        let err = Error::from(ToolError::failed("file not found"));
        assert_eq!(err.to_string(), ToolError::failed("file not found").to_string());
        assert_eq!(Error::UnknownTool("nope".into()).to_string(), "Unknown tool: nope");
    }
}
