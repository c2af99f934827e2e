//! # Threadsmith Core
//!
//! Core types for the Threadsmith agent runtime:
//!
//! - **Identifiers**: validated newtypes ([`OwnerKey`], [`SessionId`],
//!   [`FunctionName`]) and opaque remote tokens ([`ThreadId`], [`RunId`],
//!   [`AssistantId`])
//! - **[`ToolSchema`]**: declarative description of a callable function for
//!   the agent service
//! - **[`ToolFunction`]**: the callable seam implemented by native tools and
//!   dynamically loaded modules alike
//! - **[`FunctionRegistry`]**: owner-partitioned dispatch table, mutated at
//!   runtime as the agent extends itself

pub mod function;
pub mod identifiers;
pub mod registry;
pub mod schema;

pub use function::{FunctionDescriptor, FunctionError, ToolFunction};
pub use identifiers::{
    AssistantId, FunctionName, InvalidIdentifier, OwnerKey, RunId, SessionId, ThreadId,
};
pub use registry::FunctionRegistry;
pub use schema::{ParameterContract, ParameterKind, ParameterSpec, SchemaError, ToolSchema};
