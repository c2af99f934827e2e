//! Persisting agent-authored function modules.

use crate::error::{LoaderError, LoaderResult};
use std::path::{Path, PathBuf};
use threadsmith_core::FunctionName;
use tracing::{info, warn};

/// Writes new function modules into the functions directory.
///
/// The source is written verbatim — no wrapping, validation, or sandboxing
/// happens here. Validation is the loader's job when the module is
/// activated; an invalid module is simply never registered.
pub struct FunctionAuthor {
    functions_dir: PathBuf,
}

impl FunctionAuthor {
    /// Create an author writing into `functions_dir`.
    pub fn new(functions_dir: impl Into<PathBuf>) -> Self {
        Self {
            functions_dir: functions_dir.into(),
        }
    }

    /// The directory modules are written to.
    pub fn functions_dir(&self) -> &Path {
        &self.functions_dir
    }

    /// Write `source` as the module for `name`, creating the functions
    /// directory if missing, and return the resolved location.
    ///
    /// An existing module under the same name is replaced (last write wins
    /// for regenerated functions); the overwrite is logged rather than
    /// silent.
    pub async fn create(&self, name: &FunctionName, source: &str) -> LoaderResult<PathBuf> {
        tokio::fs::create_dir_all(&self.functions_dir)
            .await
            .map_err(|err| LoaderError::CreationFailed {
                name: name.clone(),
                source: err,
            })?;

        let path = self.functions_dir.join(format!("{name}.rhai"));
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            warn!(function = %name, path = %path.display(), "Overwriting existing function module");
        }

        tokio::fs::write(&path, source)
            .await
            .map_err(|err| LoaderError::CreationFailed {
                name: name.clone(),
                source: err,
            })?;

        info!(function = %name, path = %path.display(), "Function module written");
        Ok(path)
    }
}
