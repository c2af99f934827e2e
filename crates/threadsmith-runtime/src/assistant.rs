//! The Assistant Definition Store interface boundary.
//!
//! The store keeps the remote assistant definition: which assistant answers
//! for an owner key, and which tool schemas that assistant declares. The
//! declared schema list is the source of truth the registry is (re)built
//! from.

use crate::error::ServiceError;
use async_trait::async_trait;
use threadsmith_core::{AssistantId, FunctionName, OwnerKey, ToolSchema};

/// Remote store of assistant definitions, partitioned by owner key.
#[async_trait]
pub trait AssistantStore: Send + Sync {
    /// Resolve the assistant answering for an owner, if one exists.
    async fn find_assistant(&self, owner: &OwnerKey) -> Result<Option<AssistantId>, ServiceError>;

    /// The tool schemas currently declared for the owner's assistant.
    async fn list_tool_schemas(&self, owner: &OwnerKey) -> Result<Vec<ToolSchema>, ServiceError>;

    /// Declare a tool for the owner's assistant so later turns may invoke
    /// it. Publishing an already-declared name is a no-op.
    async fn publish_tool(&self, owner: &OwnerKey, schema: &ToolSchema) -> Result<(), ServiceError>;

    /// Remove a declared tool from the owner's assistant.
    async fn remove_tool(&self, owner: &OwnerKey, name: &FunctionName) -> Result<(), ServiceError>;
}
