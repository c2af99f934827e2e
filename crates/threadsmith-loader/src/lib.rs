//! # Threadsmith Loader
//!
//! Dynamic function modules for the Threadsmith runtime:
//!
//! - **[`FunctionLoader`]**: resolves a function name to its source module,
//!   discovers and installs missing dependencies, performs a fresh load, and
//!   returns a validated [`FunctionDescriptor`]
//! - **[`FunctionAuthor`]**: persists agent-authored source so it can be
//!   hot-loaded without a restart
//! - **[`ModuleInstaller`]**: the opaque install capability behind
//!   dependency resolution
//!
//! Modules are Rhai scripts following the export contract documented in
//! [`script`]; loading never caches, so a regenerated module is always
//! re-observed.
//!
//! [`FunctionDescriptor`]: threadsmith_core::FunctionDescriptor

pub mod author;
pub mod error;
pub mod install;
pub mod loader;
pub mod script;

pub use author::FunctionAuthor;
pub use error::{LoaderError, LoaderResult};
pub use install::{CommandInstaller, InstallError, ModuleInstaller, NullInstaller};
pub use loader::{FunctionLoader, LoadReport};
pub use script::{EXPORT_FUNCTION_NAME, EXPORT_FUNCTION_OPTIONS, HOST_MODULES, ScriptHost};
