//! Turning a function name into a runnable unit.
//!
//! The loader resolves the function's source module from the naming
//! convention (`<functions_dir>/<name>.rhai`), discovers its external
//! dependencies with a line-oriented import scan, ensures each one is
//! resolvable (installing on demand, one at a time), performs a fresh load,
//! and yields a validated [`FunctionDescriptor`] for registration.

use crate::error::{LoaderError, LoaderResult};
use crate::install::ModuleInstaller;
use crate::script::{HOST_MODULES, ScriptHost};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use threadsmith_core::{FunctionDescriptor, FunctionName, OwnerKey};
use tracing::{debug, warn};

static IMPORT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*import\s+"([^"]+)""#).expect("import pattern compiles"));

/// Collect external dependency candidates from a module's import statements.
/// Host-provided modules are excluded; duplicates are collapsed in order of
/// first appearance.
pub(crate) fn scan_imports(source: &str) -> Vec<String> {
    let mut dependencies = Vec::new();
    for line in source.lines() {
        if let Some(captures) = IMPORT_PATTERN.captures(line) {
            let module = captures[1].to_string();
            if !HOST_MODULES.contains(&module.as_str()) && !dependencies.contains(&module) {
                dependencies.push(module);
            }
        }
    }
    dependencies
}

/// Outcome of a bulk load: one bad module never blocks its siblings.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Descriptors that validated, in input order.
    pub loaded: Vec<FunctionDescriptor>,
    /// Functions that were skipped, with the error that caused it.
    pub skipped: Vec<(FunctionName, LoaderError)>,
}

impl LoadReport {
    /// Names of the functions that loaded, in input order.
    pub fn loaded_names(&self) -> Vec<FunctionName> {
        self.loaded.iter().map(|d| d.name.clone()).collect()
    }
}

/// Loads function modules from the functions directory.
///
/// Loads for the same owner are serialized: they share the on-disk module
/// directory and an install may be in flight. Loads for different owners
/// proceed independently.
pub struct FunctionLoader {
    functions_dir: PathBuf,
    host: ScriptHost,
    installer: Arc<dyn ModuleInstaller>,
    owner_locks: StdMutex<HashMap<OwnerKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl FunctionLoader {
    /// Create a loader rooted at `functions_dir`.
    pub fn new(functions_dir: impl Into<PathBuf>, installer: Arc<dyn ModuleInstaller>) -> Self {
        let functions_dir = functions_dir.into();
        let host = ScriptHost::new(&functions_dir);
        Self {
            functions_dir,
            host,
            installer,
            owner_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// The directory function modules are resolved from.
    pub fn functions_dir(&self) -> &Path {
        &self.functions_dir
    }

    /// Expected source location for a function name.
    pub fn module_path(&self, name: &FunctionName) -> PathBuf {
        self.functions_dir.join(format!("{name}.rhai"))
    }

    fn owner_lock(&self, owner: &OwnerKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .owner_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(owner.clone()).or_default().clone()
    }

    /// Load a single function for an owner.
    pub async fn load(
        &self,
        owner: &OwnerKey,
        name: &FunctionName,
    ) -> LoaderResult<FunctionDescriptor> {
        let lock = self.owner_lock(owner);
        let _guard = lock.lock().await;
        self.load_module(name).await
    }

    /// Load every declared function for an owner. A single function's
    /// failure is logged and that function skipped; the batch continues.
    pub async fn load_all(&self, owner: &OwnerKey, names: &[FunctionName]) -> LoadReport {
        let lock = self.owner_lock(owner);
        let _guard = lock.lock().await;

        let mut report = LoadReport::default();
        for name in names {
            match self.load_module(name).await {
                Ok(descriptor) => report.loaded.push(descriptor),
                Err(err) => {
                    warn!(
                        owner = %owner,
                        function = %name,
                        error = %err,
                        "Skipping function that failed to load"
                    );
                    report.skipped.push((name.clone(), err));
                }
            }
        }
        report
    }

    async fn load_module(&self, name: &FunctionName) -> LoaderResult<FunctionDescriptor> {
        let path = self.module_path(name);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(LoaderError::ModuleNotFound {
                name: name.clone(),
                path,
            });
        }

        let source = tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| LoaderError::Io {
                name: name.clone(),
                source: err,
            })?;

        // Dependencies install synchronously and sequentially; an install
        // failure aborts this load and propagates.
        for module in scan_imports(&source) {
            let module_path = self.functions_dir.join(format!("{module}.rhai"));
            if tokio::fs::try_exists(&module_path).await.unwrap_or(false) {
                continue;
            }
            debug!(function = %name, module, "Dependency not resolvable, installing");
            self.installer
                .install(&module)
                .await
                .map_err(|source| LoaderError::DependencyInstall {
                    name: name.clone(),
                    module: module.clone(),
                    source,
                })?;
        }

        self.host.load_module(name, &source)
    }
}
