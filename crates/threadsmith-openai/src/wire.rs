//! Wire envelopes specific to the Assistants REST surface.
//!
//! Run and message payloads decode directly into the runtime's types; the
//! structs here cover the remaining envelopes (lists, threads, assistants,
//! error bodies).

use serde::Deserialize;
use std::collections::HashMap;
use threadsmith_core::{AssistantId, ThreadId};

/// Paginated list envelope: `{"data": [...]}`.
#[derive(Debug, Deserialize)]
pub struct ApiList<T> {
    pub data: Vec<T>,
}

/// Error envelope: `{"error": {"message": "..."}}`.
#[derive(Debug, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
}

/// A created thread. Only the id is consumed.
#[derive(Debug, Deserialize)]
pub struct ApiThread {
    pub id: ThreadId,
}

/// An assistant definition as the service returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiAssistant {
    pub id: AssistantId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(default)]
    pub tools: Vec<serde_json::Value>,
}

impl ApiAssistant {
    /// The `created_by` metadata value, the owner-key convention used to
    /// partition assistants.
    pub fn created_by(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get("created_by"))
            .map(String::as_str)
    }

    /// Names of the function tools this assistant declares.
    pub fn function_tool_names(&self) -> Vec<&str> {
        self.tools
            .iter()
            .filter_map(|tool| tool.get("function"))
            .filter_map(|function| function.get("name"))
            .filter_map(|name| name.as_str())
            .collect()
    }
}
