//! The module-install capability.
//!
//! When a function module imports a dependency that is not present in the
//! functions directory, the loader asks a [`ModuleInstaller`] to fetch it.
//! Installation is an opaque one-shot operation: it either makes the module
//! resolvable or fails, and the loader never retries.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

/// Failure of a module installation attempt.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// The install command ran but did not succeed.
    #[error("install command failed for module '{module}': {message}")]
    CommandFailed { module: String, message: String },

    /// The install command could not be spawned at all.
    #[error("failed to spawn install command: {0}")]
    Spawn(String),

    /// No installer is configured in this deployment.
    #[error("no installer available for module '{0}'")]
    Unavailable(String),
}

/// Capability to make a missing module resolvable.
#[async_trait]
pub trait ModuleInstaller: Send + Sync {
    /// Install `module` so a subsequent resolution probe succeeds. Blocking
    /// the caller for the duration is expected; the loader serializes
    /// installs deliberately.
    async fn install(&self, module: &str) -> Result<(), InstallError>;
}

/// Installer for sealed deployments: every install attempt fails, so a
/// module importing an unknown dependency cannot be loaded.
pub struct NullInstaller;

#[async_trait]
impl ModuleInstaller for NullInstaller {
    async fn install(&self, module: &str) -> Result<(), InstallError> {
        warn!(module, "Module dependency missing and no installer is configured");
        Err(InstallError::Unavailable(module.to_string()))
    }
}

/// Installer that shells out to a configurable fetch command, invoked as
/// `<program> <args...> <module>`. The command is responsible for placing
/// the module file where the loader resolves imports.
pub struct CommandInstaller {
    program: String,
    args: Vec<String>,
}

impl CommandInstaller {
    /// Create an installer around the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a fixed argument passed before the module name.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

#[async_trait]
impl ModuleInstaller for CommandInstaller {
    async fn install(&self, module: &str) -> Result<(), InstallError> {
        info!(module, program = %self.program, "Installing missing module dependency");
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(module)
            .status()
            .await
            .map_err(|err| InstallError::Spawn(err.to_string()))?;

        if status.success() {
            info!(module, "Module dependency installed");
            Ok(())
        } else {
            Err(InstallError::CommandFailed {
                module: module.to_string(),
                message: format!("exit status {status}"),
            })
        }
    }
}
