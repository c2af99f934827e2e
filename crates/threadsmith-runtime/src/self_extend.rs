//! The built-in self-extension tool.
//!
//! `create_new_function` is the one tool every owner gets without loading
//! anything from disk: it persists agent-authored source through the
//! [`FunctionAuthor`] and reports where it landed. Activation of the new
//! module (load, register, publish) is the coordinator's follow-up, not
//! part of this call — the creation result stands even if activation later
//! fails.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use threadsmith_core::{FunctionError, FunctionName, ParameterSpec, ToolFunction, ToolSchema};
use threadsmith_loader::FunctionAuthor;

/// Registered name of the self-extension tool.
pub const CREATE_FUNCTION_NAME: &str = "create_new_function";

/// The self-extension tool's name as a validated identifier.
pub fn create_function_name() -> FunctionName {
    FunctionName::new_unchecked(CREATE_FUNCTION_NAME)
}

/// Schema published for the self-extension tool.
pub fn create_function_schema() -> ToolSchema {
    ToolSchema::new(
        create_function_name(),
        "Create a new function and make it callable on later turns",
    )
    .with_parameter("name", ParameterSpec::string("The name of the new function"))
    .with_parameter(
        "code",
        ParameterSpec::string("The complete source of the new function module"),
    )
    .with_required("name")
    .with_required("code")
}

/// Expected arguments: `{ "name": string, "code": string }`. The code is
/// written verbatim as the module's entire source text.
#[derive(Debug, Deserialize)]
struct CreateFunctionArgs {
    name: String,
    code: String,
}

/// Native tool wrapping the function author.
pub struct CreateFunctionTool {
    author: Arc<FunctionAuthor>,
}

impl CreateFunctionTool {
    /// Create the tool around an author.
    pub fn new(author: Arc<FunctionAuthor>) -> Self {
        Self { author }
    }
}

#[async_trait]
impl ToolFunction for CreateFunctionTool {
    async fn invoke(&self, args: serde_json::Value) -> Result<serde_json::Value, FunctionError> {
        let request: CreateFunctionArgs = serde_json::from_value(args)
            .map_err(|err| FunctionError::InvalidArguments(err.to_string()))?;
        let name = FunctionName::parse(&request.name).map_err(|err| {
            FunctionError::InvalidArguments(format!("invalid function name: {err}"))
        })?;

        let path = self
            .author
            .create(&name, &request.code)
            .await
            .map_err(|err| FunctionError::Execution(err.to_string()))?;

        Ok(serde_json::Value::String(format!(
            "Function {name} created and saved to {}",
            path.display()
        )))
    }
}
