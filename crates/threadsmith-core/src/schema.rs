//! Declarative tool schemas.
//!
//! A [`ToolSchema`] describes a callable function to the agent service: its
//! name, human-readable purpose, and a parameter contract. The contract is
//! advisory — the agent service enforces argument shape before dispatch, this
//! runtime does not re-validate at call time.
//!
//! The wire form is the Assistants function-tool payload:
//!
//! ```json
//! {
//!   "type": "function",
//!   "function": {
//!     "name": "fetchBitcoinPrice",
//!     "description": "Fetch the current Bitcoin price",
//!     "parameters": {
//!       "type": "object",
//!       "properties": { "currency": { "type": "string" } },
//!       "required": ["currency"]
//!     }
//!   }
//! }
//! ```
//!
//! [`ToolSchema::from_tool_payload`] accepts both the wrapped form above and
//! the bare inner `function` object, since dynamically loaded modules may
//! export either.

use crate::identifiers::{FunctionName, InvalidIdentifier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Errors produced while decoding a tool schema payload.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    /// The payload could not be decoded into a schema.
    #[error("invalid tool schema payload: {0}")]
    Decode(String),
    /// The embedded function name failed identifier validation.
    #[error("invalid function name in schema: {0}")]
    InvalidName(#[from] InvalidIdentifier),
}

/// Primitive kind of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

/// Declaration of a single named parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// The parameter's declared type.
    #[serde(rename = "type")]
    pub kind: ParameterKind,
    /// Human-readable description shown to the agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Nested contract fields (`items`, `properties`, `enum`, ...) are kept
    /// verbatim rather than modeled; the service is their consumer.
    #[serde(flatten, default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ParameterSpec {
    /// Create a parameter spec of the given kind with no description.
    pub fn new(kind: ParameterKind) -> Self {
        Self {
            kind,
            description: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Create a string parameter with a description.
    pub fn string(description: impl Into<String>) -> Self {
        Self::new(ParameterKind::String).with_description(description)
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The parameter contract of a function: named parameters plus the subset
/// that is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterContract {
    #[serde(rename = "type", default = "object_type")]
    kind: String,
    #[serde(default)]
    pub properties: BTreeMap<String, ParameterSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

fn object_type() -> String {
    "object".to_string()
}

impl Default for ParameterContract {
    fn default() -> Self {
        Self {
            kind: object_type(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

/// Declarative description of a callable function.
///
/// Invariant: `name` equals the name the callable is registered under. The
/// loader enforces this when activating a module; [`ToolSchema::from_tool_payload`]
/// enforces only identifier validity.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSchema {
    pub name: FunctionName,
    pub description: String,
    pub parameters: ParameterContract,
}

#[derive(Deserialize)]
struct FunctionPayload {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    parameters: ParameterContract,
}

impl ToolSchema {
    /// Create a schema with an empty parameter contract.
    pub fn new(name: FunctionName, description: impl Into<String>) -> Self {
        Self {
            name,
            description: description.into(),
            parameters: ParameterContract::default(),
        }
    }

    /// Add a named parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        self.parameters.properties.insert(name.into(), spec);
        self
    }

    /// Mark a parameter as required.
    pub fn with_required(mut self, name: impl Into<String>) -> Self {
        self.parameters.required.push(name.into());
        self
    }

    /// Decode a schema from a function-tool payload, accepting both the
    /// wrapped `{"type": "function", "function": {...}}` form and the bare
    /// inner object.
    pub fn from_tool_payload(value: serde_json::Value) -> Result<Self, SchemaError> {
        let inner = match value {
            serde_json::Value::Object(mut map) => match map.remove("function") {
                Some(function) => function,
                None => serde_json::Value::Object(map),
            },
            other => other,
        };
        let wire: FunctionPayload =
            serde_json::from_value(inner).map_err(|err| SchemaError::Decode(err.to_string()))?;
        Ok(Self {
            name: FunctionName::parse(&wire.name)?,
            description: wire.description,
            parameters: wire.parameters,
        })
    }

    /// Encode the wrapped function-tool payload expected by the agent
    /// service.
    pub fn to_tool_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name.as_str(),
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}
