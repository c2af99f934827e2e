//! The callable seam between the coordinator and function implementations.
//!
//! A [`ToolFunction`] is anything the agent can invoke: a native Rust tool,
//! a dynamically loaded script module, or a test double. Arguments arrive as
//! the JSON object the agent service produced for the call; the return value
//! is serialized back into the call's tool output.

use crate::identifiers::FunctionName;
use crate::schema::ToolSchema;
use async_trait::async_trait;
use std::sync::Arc;

/// Failure of a single function invocation.
///
/// Both variants are converted into a structured failure payload at dispatch
/// time — an invocation error never aborts the surrounding tool-call batch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FunctionError {
    /// The arguments did not match what the function expects.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// The function body failed.
    #[error("execution failed: {0}")]
    Execution(String),
}

/// An invocable function implementation.
#[async_trait]
pub trait ToolFunction: Send + Sync {
    /// Execute with the given arguments object.
    async fn invoke(&self, args: serde_json::Value) -> Result<serde_json::Value, FunctionError>;
}

/// A validated, activatable function: the loader's return value.
///
/// Bundling the three pieces keeps the registry invariant (schema name ==
/// registered name) checkable in one place instead of at every call site.
#[derive(Clone)]
pub struct FunctionDescriptor {
    pub name: FunctionName,
    pub schema: ToolSchema,
    pub callable: Arc<dyn ToolFunction>,
}

impl std::fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDescriptor")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}
