//! # Threadsmith Runtime
//!
//! Run coordination for the Threadsmith agent runtime:
//!
//! - **[`RunCoordinator`]**: the per-session state machine driving a turn
//!   from user message through tool-call batches to the terminal reply
//! - **[`SessionManager`]**: lazily maps session identifiers to
//!   conversation threads, one thread per session for the process lifetime
//! - **[`RunService`] / [`AssistantStore`]**: interface boundaries of the
//!   remote collaborators
//! - **[`CreateFunctionTool`]**: the built-in self-extension tool; its
//!   activation path makes agent-authored code dispatchable in the same
//!   process, same turn

pub mod assistant;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod notify;
pub mod run_service;
pub mod self_extend;
pub mod session;

pub use assistant::AssistantStore;
pub use config::CoordinatorConfig;
pub use coordinator::RunCoordinator;
pub use error::{CoordinatorError, CoordinatorResult, ServiceError};
pub use notify::{ActionNotifier, LogNotifier, UI_ACTION_PREFIX, UiAction};
pub use run_service::{
    FunctionCall, MessageContent, MessageRole, RequiredAction, Run, RunService, RunStatus,
    SubmitToolOutputsAction, TextContent, ThreadMessage, ToolCallRequest, ToolOutput,
};
pub use self_extend::{
    CREATE_FUNCTION_NAME, CreateFunctionTool, create_function_name, create_function_schema,
};
pub use session::SessionManager;
