//! OrchestratorBuilder for fluent orchestrator construction
//!
//! Only the model and the executor are required. Everything else falls back
//! to a fresh default: the built-in tool catalog, an empty permission
//! manager and an in-memory audit sink.

use std::sync::Arc;
use std::time::Duration;

use crate::audit::{AuditSink, MemoryAuditSink};
use crate::config::OrchestratorConfig;
use crate::executor::{Resources, ToolExecutor};
use crate::i18n::Locale;
use crate::permission::PermissionManager;
use crate::provider::ChatModel;
use crate::registry::ToolRegistry;

use super::Orchestrator;

/// Errors that can occur when building an orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// No model was configured.
    #[error("No model configured. Call .model() before .build()")]
    MissingModel,

    /// No tool executor was configured.
    #[error("No tool executor configured. Call .executor() before .build()")]
    MissingExecutor,

    /// The configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Builder for creating an [`Orchestrator`].
///
/// Share one [`PermissionManager`] between orchestrators by passing the same
/// `Arc` to [`permissions`](Self::permissions).
#[derive(Default)]
pub struct OrchestratorBuilder {
    model: Option<Arc<dyn ChatModel>>,
    executor: Option<Arc<dyn ToolExecutor>>,
    registry: Option<Arc<ToolRegistry>>,
    permissions: Option<Arc<PermissionManager>>,
    audit: Option<Arc<dyn AuditSink>>,
    resources: Resources,
    config: OrchestratorConfig,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(self, model: impl ChatModel + 'static) -> Self {
        self.model_arc(Arc::new(model))
    }

    pub fn model_arc(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn executor(self, executor: impl ToolExecutor + 'static) -> Self {
        self.executor_arc(Arc::new(executor))
    }

    pub fn executor_arc(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Use this catalog instead of the built-in tools.
    pub fn registry(self, registry: ToolRegistry) -> Self {
        self.registry_arc(Arc::new(registry))
    }

    pub fn registry_arc(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn permissions(mut self, permissions: Arc<PermissionManager>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn audit(self, audit: impl AuditSink + 'static) -> Self {
        self.audit_arc(Arc::new(audit))
    }

    pub fn audit_arc(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Resources handed to the executor with every call.
    pub fn resources(mut self, resources: Resources) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.config.locale = locale;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.config.tool_timeout_ms = Some(timeout.as_millis().max(1) as u64);
        self
    }

    pub fn with_audit_timeout(mut self, timeout: Duration) -> Self {
        self.config.audit_timeout_ms = timeout.as_millis().max(1) as u64;
        self
    }

    pub fn build(self) -> Result<Orchestrator, BuildError> {
        self.config.validate().map_err(BuildError::InvalidConfig)?;

        Ok(Orchestrator {
            model: self.model.ok_or(BuildError::MissingModel)?,
            executor: self.executor.ok_or(BuildError::MissingExecutor)?,
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(ToolRegistry::with_builtin_tools())),
            permissions: self.permissions.unwrap_or_default(),
            audit: self
                .audit
                .unwrap_or_else(|| Arc::new(MemoryAuditSink::new())),
            resources: Arc::new(self.resources),
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ToolHandlers;
    use crate::provider::{ChatMessage, ModelResponse, ProviderError};
    use crate::registry::ToolSchema;

    struct Silent;

    #[async_trait::async_trait]
    impl ChatModel for Silent {
        fn name(&self) -> &str {
            "silent"
        }

        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _tools: &[ToolSchema],
        ) -> Result<ModelResponse, ProviderError> {
            Ok(ModelResponse::default())
        }
    }

    #[test]
    fn test_build_requires_model() {
        let err = OrchestratorBuilder::new()
            .executor(ToolHandlers::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingModel));
    }

    #[test]
    fn test_build_requires_executor() {
        let err = OrchestratorBuilder::new().model(Silent).build().unwrap_err();
        assert!(matches!(err, BuildError::MissingExecutor));
    }

    #[test]
    fn test_build_defaults() {
        let orchestrator = OrchestratorBuilder::new()
            .model(Silent)
            .executor(ToolHandlers::new())
            .build()
            .unwrap();

        assert_eq!(orchestrator.registry().len(), 9);
        assert_eq!(orchestrator.config().max_iterations, 10);
        assert_eq!(orchestrator.model_name(), "silent");
    }

    #[test]
    fn test_build_shares_permissions() {
        let permissions = Arc::new(PermissionManager::new());
        let orchestrator = OrchestratorBuilder::new()
            .model(Silent)
            .executor(ToolHandlers::new())
            .permissions(permissions.clone())
            .with_max_iterations(3)
            .with_locale(Locale::De)
            .build()
            .unwrap();

        assert!(Arc::ptr_eq(orchestrator.permissions(), &permissions));
        assert_eq!(orchestrator.config().max_iterations, 3);
        assert_eq!(orchestrator.config().locale, Locale::De);
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let err = OrchestratorBuilder::new()
            .model(Silent)
            .executor(ToolHandlers::new())
            .with_config(OrchestratorConfig {
                channel_capacity: 0,
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidConfig(_)));
    }
}
