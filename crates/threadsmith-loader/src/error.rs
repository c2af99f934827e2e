//! Loader and authoring errors.

use crate::install::InstallError;
use std::path::PathBuf;
use threadsmith_core::FunctionName;

/// Errors that can occur while loading or authoring a function module.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// No source module exists at the expected location.
    #[error("function module '{name}' not found at {path}")]
    ModuleNotFound { name: FunctionName, path: PathBuf },

    /// The module violated the export contract or failed to parse.
    #[error("invalid function module '{name}': {reason}")]
    InvalidModule { name: FunctionName, reason: String },

    /// A dependency of the module could not be installed. Propagates
    /// uncaught and aborts this load; in a bulk load only this one
    /// function is skipped.
    #[error("failed to install dependency '{module}' of '{name}'")]
    DependencyInstall {
        name: FunctionName,
        module: String,
        #[source]
        source: InstallError,
    },

    /// Writing a newly authored module to durable storage failed.
    #[error("failed to write function module '{name}'")]
    CreationFailed {
        name: FunctionName,
        #[source]
        source: std::io::Error,
    },

    /// Reading the module source failed.
    #[error("failed to read function module '{name}'")]
    Io {
        name: FunctionName,
        #[source]
        source: std::io::Error,
    },
}

impl LoaderError {
    /// Shorthand for an export-contract violation.
    pub(crate) fn invalid(name: &FunctionName, reason: impl Into<String>) -> Self {
        LoaderError::InvalidModule {
            name: name.clone(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for loader operations.
pub type LoaderResult<T> = Result<T, LoaderError>;
