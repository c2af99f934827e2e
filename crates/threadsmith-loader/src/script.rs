//! Embedded script host for dynamically loaded function modules.
//!
//! Function modules are Rhai scripts, one file per function. A module must
//! satisfy the export contract:
//!
//! ```rhai
//! const FUNCTION_NAME = "echoTest";       // string constant, the registered name
//! const FUNCTION_OPTIONS = #{ /* ... */ }; // tool schema object for the agent
//!
//! fn echoTest(args) {                      // callable under that exact name
//!     #{ "success": true, "echo": args.text }
//! }
//! ```
//!
//! The callable takes zero or one parameter; when present, the parameter is
//! the decoded arguments object of the tool call. Anything the function
//! returns is serialized back into the call's output.
//!
//! The host's module resolver runs with caching disabled: a module whose
//! on-disk content changed since a previous load is always re-observed,
//! which is what makes hot reload of regenerated functions correct.

use crate::error::{LoaderError, LoaderResult};
use async_trait::async_trait;
use rhai::module_resolvers::FileModuleResolver;
use rhai::{AST, Dynamic, Engine, EvalAltResult, ImmutableString, Map, Module, Scope};
use std::path::Path;
use std::sync::Arc;
use threadsmith_core::{FunctionDescriptor, FunctionError, FunctionName, ToolFunction, ToolSchema};
use tracing::debug;

/// Exported constant holding the function's registered name.
pub const EXPORT_FUNCTION_NAME: &str = "FUNCTION_NAME";
/// Exported constant holding the function's tool schema.
pub const EXPORT_FUNCTION_OPTIONS: &str = "FUNCTION_OPTIONS";

/// Host modules scripts may import without declaring a dependency.
pub const HOST_MODULES: &[&str] = &["log"];

/// Shared Rhai engine configured for function modules.
pub struct ScriptHost {
    engine: Arc<Engine>,
}

impl ScriptHost {
    /// Create a host resolving `import` statements against `modules_dir`.
    pub fn new(modules_dir: &Path) -> Self {
        let mut engine = Engine::new();

        // Cache must stay off: hot reload depends on re-reading changed files.
        let mut resolver = FileModuleResolver::new_with_path(modules_dir);
        resolver.enable_cache(false);
        engine.set_module_resolver(resolver);

        engine.register_static_module("log", log_module().into());

        Self {
            engine: Arc::new(engine),
        }
    }

    /// Compile and evaluate `source`, validate the export contract, and
    /// return the typed descriptor. The registry is never touched here; a
    /// module that fails validation yields `InvalidModule` and nothing else.
    pub fn load_module(
        &self,
        name: &FunctionName,
        source: &str,
    ) -> LoaderResult<FunctionDescriptor> {
        let ast = self
            .engine
            .compile(source)
            .map_err(|err| LoaderError::invalid(name, format!("parse error: {err}")))?;

        let mut scope = Scope::new();
        self.engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|err| LoaderError::invalid(name, format!("evaluation error: {err}")))?;

        if !scope.contains(EXPORT_FUNCTION_NAME) {
            return Err(LoaderError::invalid(
                name,
                format!("missing exported constant {EXPORT_FUNCTION_NAME}"),
            ));
        }
        let exported_name: ImmutableString = scope
            .get_value::<ImmutableString>(EXPORT_FUNCTION_NAME)
            .ok_or_else(|| {
                LoaderError::invalid(name, format!("{EXPORT_FUNCTION_NAME} is not a string"))
            })?;

        // Registering under a name that differs from the module file would
        // break the name->module convention on the next reload.
        if exported_name.as_str() != name.as_str() {
            return Err(LoaderError::invalid(
                name,
                format!("exported name '{exported_name}' does not match module name"),
            ));
        }

        if !scope.contains(EXPORT_FUNCTION_OPTIONS) {
            return Err(LoaderError::invalid(
                name,
                format!("missing exported constant {EXPORT_FUNCTION_OPTIONS}"),
            ));
        }
        let options: Map = scope
            .get_value::<Map>(EXPORT_FUNCTION_OPTIONS)
            .ok_or_else(|| {
                LoaderError::invalid(name, format!("{EXPORT_FUNCTION_OPTIONS} is not an object"))
            })?;
        let options_value: serde_json::Value = rhai::serde::from_dynamic(&Dynamic::from(options))
            .map_err(|err| {
            LoaderError::invalid(name, format!("{EXPORT_FUNCTION_OPTIONS} is not valid: {err}"))
        })?;
        let schema = ToolSchema::from_tool_payload(options_value)
            .map_err(|err| LoaderError::invalid(name, format!("invalid tool schema: {err}")))?;

        if schema.name != *name {
            return Err(LoaderError::invalid(
                name,
                format!(
                    "schema declares name '{}' but the module exports '{exported_name}'",
                    schema.name
                ),
            ));
        }

        let callable_meta = ast
            .iter_functions()
            .find(|func| func.name == exported_name.as_str())
            .ok_or_else(|| {
                LoaderError::invalid(
                    name,
                    format!("value exported under '{exported_name}' is not callable"),
                )
            })?;
        let arity = callable_meta.params.len();
        if arity > 1 {
            return Err(LoaderError::invalid(
                name,
                format!("callable '{exported_name}' must take zero or one argument, takes {arity}"),
            ));
        }

        debug!(function = %name, arity, "Function module validated");

        Ok(FunctionDescriptor {
            name: name.clone(),
            schema,
            callable: Arc::new(ScriptFunction {
                engine: Arc::clone(&self.engine),
                ast: Arc::new(ast),
                name: exported_name.to_string(),
                takes_args: arity == 1,
            }),
        })
    }
}

fn log_module() -> Module {
    let mut module = Module::new();
    module.set_native_fn(
        "info",
        |message: ImmutableString| -> Result<(), Box<EvalAltResult>> {
            tracing::info!(target: "threadsmith::function", "{message}");
            Ok(())
        },
    );
    module.set_native_fn(
        "warn",
        |message: ImmutableString| -> Result<(), Box<EvalAltResult>> {
            tracing::warn!(target: "threadsmith::function", "{message}");
            Ok(())
        },
    );
    module.set_native_fn(
        "debug",
        |message: ImmutableString| -> Result<(), Box<EvalAltResult>> {
            tracing::debug!(target: "threadsmith::function", "{message}");
            Ok(())
        },
    );
    module
}

/// A loaded script callable. Evaluation is synchronous, so invocation runs
/// on the blocking pool.
struct ScriptFunction {
    engine: Arc<Engine>,
    ast: Arc<AST>,
    name: String,
    takes_args: bool,
}

#[async_trait]
impl ToolFunction for ScriptFunction {
    async fn invoke(&self, args: serde_json::Value) -> Result<serde_json::Value, FunctionError> {
        let engine = Arc::clone(&self.engine);
        let ast = Arc::clone(&self.ast);
        let name = self.name.clone();
        let takes_args = self.takes_args;

        let outcome = tokio::task::spawn_blocking(
            move || -> Result<serde_json::Value, FunctionError> {
                let mut scope = Scope::new();
                let result: Dynamic = if takes_args {
                    let dynamic_args = rhai::serde::to_dynamic(&args)
                        .map_err(|err| FunctionError::InvalidArguments(err.to_string()))?;
                    engine.call_fn::<Dynamic>(&mut scope, &ast, &name, (dynamic_args,))
                } else {
                    engine.call_fn::<Dynamic>(&mut scope, &ast, &name, ())
                }
                .map_err(|err| FunctionError::Execution(err.to_string()))?;

                rhai::serde::from_dynamic(&result)
                    .map_err(|err| FunctionError::Execution(err.to_string()))
            },
        )
        .await;

        match outcome {
            Ok(result) => result,
            Err(join_err) => Err(FunctionError::Execution(format!(
                "function task aborted: {join_err}"
            ))),
        }
    }
}
