//! Tool execution boundary.
//!
//! The orchestrator hands approved calls to a [`ToolExecutor`]. What a tool
//! actually does (file access, HTTP, shell) lives on the other side of this
//! trait.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

/// Errors returned by tool execution.
///
/// [`ToolError::Failed`] is the expected failure a tool reports on purpose
/// (access denied, file not found). Every other variant is unexpected.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Anticipated failure reported by the tool.
    #[error("{0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The executor has no implementation for this tool.
    #[error("No handler registered for tool: {0}")]
    NoHandler(String),

    /// The tool panicked.
    #[error("Tool panicked: {0}")]
    Panicked(String),

    #[error("Tool timed out after {0}ms")]
    Timeout(u64),

    #[error("{0}")]
    Unexpected(String),
}

impl ToolError {
    pub fn failed(msg: impl Into<String>) -> Self {
        ToolError::Failed(msg.into())
    }

    /// Whether the tool reported this failure deliberately.
    pub fn is_expected(&self) -> bool {
        matches!(self, ToolError::Failed(_))
    }

    /// Message shown in `tool_error` events and assistant notes.
    pub fn user_message(&self) -> String {
        if self.is_expected() {
            self.to_string()
        } else {
            format!("Unexpected error: {}", self)
        }
    }
}

impl From<String> for ToolError {
    fn from(s: String) -> Self {
        ToolError::Failed(s)
    }
}

impl From<&str> for ToolError {
    fn from(s: &str) -> Self {
        ToolError::Failed(s.to_string())
    }
}

/// Typed bag of session-scoped resources a tool may need.
#[derive(Clone, Default)]
pub struct Resources {
    map: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any earlier value of the same type.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.map.insert(TypeId::of::<T>(), Arc::new(value));
    }

    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.insert(value);
        self
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resources")
            .field("len", &self.map.len())
            .finish()
    }
}

/// Per-call context passed to the executor.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub session_id: String,
    pub agent: Option<String>,
    pub resources: Arc<Resources>,
}

impl ExecutionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            agent: None,
            resources: Arc::new(Resources::new()),
        }
    }

    pub fn resource<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.resources.get::<T>()
    }
}

/// Runs approved tool calls.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(
        &self,
        tool: &str,
        params: Value,
        context: &ExecutionContext,
    ) -> Result<Value, ToolError>;
}

type Handler =
    Arc<dyn Fn(Value, ExecutionContext) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync>;

/// Executor dispatching to one async closure per tool name.
///
/// # Example
///
/// ```rust
/// use gatehouse_core::executor::{ExecutionContext, ToolExecutor, ToolHandlers};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let handlers = ToolHandlers::new()
///     .handler("echo", |params, _ctx| async move { Ok(params) });
///
/// let ctx = ExecutionContext::new("s1");
/// let result = handlers.execute("echo", json!({"m": 1}), &ctx).await.unwrap();
/// assert_eq!(result, json!({"m": 1}));
/// # });
/// ```
#[derive(Clone, Default)]
pub struct ToolHandlers {
    handlers: HashMap<String, Handler>,
}

impl ToolHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value, ExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |params: Value, ctx: ExecutionContext| {
            Box::pin(f(params, ctx)) as BoxFuture<'static, Result<Value, ToolError>>
        });
        self.handlers.insert(name.into(), handler);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

impl fmt::Debug for ToolHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("ToolHandlers").field("tools", &names).finish()
    }
}

#[async_trait]
impl ToolExecutor for ToolHandlers {
    async fn execute(
        &self,
        tool: &str,
        params: Value,
        context: &ExecutionContext,
    ) -> Result<Value, ToolError> {
        let handler = self
            .handlers
            .get(tool)
            .ok_or_else(|| ToolError::NoHandler(tool.to_string()))?;
        handler(params, context.clone()).await
    }
}
