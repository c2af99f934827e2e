//! # Threadsmith
//!
//! Threadsmith coordinates a conversational agent's multi-turn tool-use
//! loop: it drives runs to completion, dispatches requested tool calls
//! against a per-owner function registry, and lets the agent extend itself
//! at runtime — a function authored during a turn is persisted, hot-loaded,
//! and immediately callable.
//!
//! ## Core Components
//!
//! - **[`FunctionRegistry`]**: owner-partitioned dispatch table
//! - **[`FunctionLoader`] / [`FunctionAuthor`]**: dynamic module loading
//!   and self-extension persistence
//! - **[`RunCoordinator`]**: the per-session run state machine
//! - **[`SessionManager`]**: one lazily-created thread per session
//! - **[`OpenAiClient`]**: Run Service and Assistant Store over an
//!   OpenAI-compatible Assistants v2 REST surface
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use threadsmith::{
//!     AssistantStore, FunctionAuthor, FunctionLoader, FunctionRegistry, NullInstaller,
//!     OpenAiClient, OpenAiConfig, OwnerKey, RunCoordinator, RunService, SessionManager,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(OpenAiClient::new(OpenAiConfig::from_env()?));
//! let run_service: Arc<dyn RunService> = client.clone();
//! let store: Arc<dyn AssistantStore> = client.clone();
//!
//! let coordinator = RunCoordinator::new(
//!     run_service,
//!     store,
//!     Arc::new(FunctionRegistry::new()),
//!     Arc::new(FunctionLoader::new("functions", Arc::new(NullInstaller))),
//!     Arc::new(FunctionAuthor::new("functions")),
//! );
//!
//! let owner = OwnerKey::parse("my-owner")?;
//! coordinator.publish_builtins(&owner).await?;
//! coordinator.load_functions(&owner).await?;
//!
//! let session = SessionManager::new_session_id();
//! let reply = coordinator
//!     .handle_user_message(&owner, &session, "hello")
//!     .await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Module aliases for namespaced access
// ============================================================================

pub use threadsmith_core as core;
pub use threadsmith_loader as loader;
pub use threadsmith_openai as openai;
pub use threadsmith_runtime as runtime;

// ============================================================================
// Core types - identifiers, schemas, registry
// ============================================================================

pub use threadsmith_core::{
    AssistantId, FunctionDescriptor, FunctionError, FunctionName, FunctionRegistry,
    InvalidIdentifier, OwnerKey, ParameterContract, ParameterKind, ParameterSpec, RunId,
    SchemaError, SessionId, ThreadId, ToolFunction, ToolSchema,
};

// ============================================================================
// Dynamic loading and self-extension
// ============================================================================

pub use threadsmith_loader::{
    CommandInstaller, FunctionAuthor, FunctionLoader, InstallError, LoadReport, LoaderError,
    ModuleInstaller, NullInstaller, ScriptHost,
};

// ============================================================================
// Run coordination
// ============================================================================

pub use threadsmith_runtime::{
    ActionNotifier, AssistantStore, CoordinatorConfig, CoordinatorError, CoordinatorResult,
    CreateFunctionTool, LogNotifier, MessageRole, Run, RunCoordinator, RunService, RunStatus,
    ServiceError, SessionManager, ThreadMessage, ToolCallRequest, ToolOutput, UI_ACTION_PREFIX,
    UiAction, CREATE_FUNCTION_NAME,
};

// ============================================================================
// Run Service client
// ============================================================================

pub use threadsmith_openai::{AssistantOptions, OpenAiClient, OpenAiConfig};
