//! The OpenAI-compatible REST client.

use crate::wire::{ApiAssistant, ApiErrorEnvelope, ApiList, ApiThread};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt;
use threadsmith_core::{AssistantId, FunctionName, OwnerKey, RunId, ThreadId, ToolSchema};
use threadsmith_runtime::{
    AssistantStore, MessageRole, Run, RunService, ServiceError, ThreadMessage, ToolOutput,
};
use tracing::{debug, info, warn};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Configuration error for the client.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{API_KEY_ENV} is not set")]
    MissingApiKey,
}

/// Client configuration. The key is redacted from debug output.
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
}

impl OpenAiConfig {
    /// Configuration against the default API root.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Read the API key from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        std::env::var(API_KEY_ENV)
            .map(Self::new)
            .map_err(|_| ConfigError::MissingApiKey)
    }

    /// Point the client at a different API root (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"[redacted]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Options for creating an assistant when none exists for an owner.
#[derive(Debug, Clone)]
pub struct AssistantOptions {
    pub name: String,
    pub instructions: String,
    pub model: String,
}

impl Default for AssistantOptions {
    fn default() -> Self {
        Self {
            name: "Threadsmith Assistant".to_string(),
            instructions: "You are a helpful assistant. Use the available tools when they apply."
                .to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

/// Run Service and Assistant Store against an OpenAI-compatible
/// Assistants v2 REST surface.
pub struct OpenAiClient {
    http: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Create a client.
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ServiceError> {
        let response = request
            .bearer_auth(&self.config.api_key)
            .header("OpenAI-Beta", "assistants=v2")
            .send()
            .await
            .map_err(|err| ServiceError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ServiceError::Transport(err.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|err| ServiceError::Decode(err.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        self.send(self.http.get(self.url(path))).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ServiceError> {
        self.send(self.http.post(self.url(path)).json(body)).await
    }

    async fn find_assistant_record(
        &self,
        owner: &OwnerKey,
    ) -> Result<Option<ApiAssistant>, ServiceError> {
        let assistants: ApiList<ApiAssistant> = self.get_json("/assistants?limit=100").await?;
        Ok(assistants
            .data
            .into_iter()
            .find(|assistant| assistant.created_by() == Some(owner.as_str())))
    }

    async fn update_tools(
        &self,
        assistant_id: &AssistantId,
        tools: Vec<serde_json::Value>,
    ) -> Result<(), ServiceError> {
        let _: ApiAssistant = self
            .post_json(
                &format!("/assistants/{assistant_id}"),
                &serde_json::json!({ "tools": tools }),
            )
            .await?;
        Ok(())
    }

    /// Find the assistant for an owner, creating it with the given options
    /// when absent. The owner key lands in `metadata.created_by`.
    pub async fn ensure_assistant(
        &self,
        owner: &OwnerKey,
        options: AssistantOptions,
    ) -> Result<AssistantId, ServiceError> {
        if let Some(existing) = self.find_assistant_record(owner).await? {
            return Ok(existing.id);
        }

        let created: ApiAssistant = self
            .post_json(
                "/assistants",
                &serde_json::json!({
                    "name": options.name,
                    "instructions": options.instructions,
                    "model": options.model,
                    "metadata": { "created_by": owner.as_str() },
                }),
            )
            .await?;
        info!(owner = %owner, assistant = %created.id, "Created assistant");
        Ok(created.id)
    }
}

#[async_trait]
impl RunService for OpenAiClient {
    async fn create_thread(&self) -> Result<ThreadId, ServiceError> {
        let thread: ApiThread = self.post_json("/threads", &serde_json::json!({})).await?;
        debug!(thread = %thread.id, "Created thread");
        Ok(thread.id)
    }

    async fn create_message(
        &self,
        thread_id: &ThreadId,
        role: MessageRole,
        text: &str,
    ) -> Result<ThreadMessage, ServiceError> {
        self.post_json(
            &format!("/threads/{thread_id}/messages"),
            &serde_json::json!({ "role": role, "content": text }),
        )
        .await
    }

    async fn create_run(
        &self,
        assistant_id: &AssistantId,
        thread_id: &ThreadId,
    ) -> Result<Run, ServiceError> {
        self.post_json(
            &format!("/threads/{thread_id}/runs"),
            &serde_json::json!({ "assistant_id": assistant_id }),
        )
        .await
    }

    async fn get_run(&self, thread_id: &ThreadId, run_id: &RunId) -> Result<Run, ServiceError> {
        self.get_json(&format!("/threads/{thread_id}/runs/{run_id}"))
            .await
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &ThreadId,
        run_id: &RunId,
        outputs: Vec<ToolOutput>,
    ) -> Result<Run, ServiceError> {
        self.post_json(
            &format!("/threads/{thread_id}/runs/{run_id}/submit_tool_outputs"),
            &serde_json::json!({ "tool_outputs": outputs }),
        )
        .await
    }

    async fn list_runs(&self, thread_id: &ThreadId) -> Result<Vec<Run>, ServiceError> {
        let runs: ApiList<Run> = self.get_json(&format!("/threads/{thread_id}/runs")).await?;
        Ok(runs.data)
    }

    async fn list_messages(&self, thread_id: &ThreadId) -> Result<Vec<ThreadMessage>, ServiceError> {
        let messages: ApiList<ThreadMessage> = self
            .get_json(&format!("/threads/{thread_id}/messages"))
            .await?;
        Ok(messages.data)
    }
}

#[async_trait]
impl AssistantStore for OpenAiClient {
    async fn find_assistant(&self, owner: &OwnerKey) -> Result<Option<AssistantId>, ServiceError> {
        Ok(self
            .find_assistant_record(owner)
            .await?
            .map(|assistant| assistant.id))
    }

    async fn list_tool_schemas(&self, owner: &OwnerKey) -> Result<Vec<ToolSchema>, ServiceError> {
        let Some(assistant) = self.find_assistant_record(owner).await? else {
            return Ok(Vec::new());
        };

        let mut schemas = Vec::new();
        for tool in assistant.tools {
            if tool.get("function").is_none() {
                continue;
            }
            match ToolSchema::from_tool_payload(tool) {
                Ok(schema) => schemas.push(schema),
                Err(err) => {
                    warn!(owner = %owner, error = %err, "Skipping undecodable tool schema")
                }
            }
        }
        Ok(schemas)
    }

    async fn publish_tool(&self, owner: &OwnerKey, schema: &ToolSchema) -> Result<(), ServiceError> {
        let Some(assistant) = self.find_assistant_record(owner).await? else {
            return Err(ServiceError::Api {
                status: 404,
                message: format!("no assistant for owner '{owner}'"),
            });
        };

        if assistant
            .function_tool_names()
            .contains(&schema.name.as_str())
        {
            debug!(owner = %owner, function = %schema.name, "Tool already declared");
            return Ok(());
        }

        let mut tools = assistant.tools;
        tools.push(schema.to_tool_payload());
        self.update_tools(&assistant.id, tools).await?;
        info!(owner = %owner, function = %schema.name, "Tool published to assistant");
        Ok(())
    }

    async fn remove_tool(&self, owner: &OwnerKey, name: &FunctionName) -> Result<(), ServiceError> {
        let Some(assistant) = self.find_assistant_record(owner).await? else {
            return Err(ServiceError::Api {
                status: 404,
                message: format!("no assistant for owner '{owner}'"),
            });
        };

        let tools: Vec<serde_json::Value> = assistant
            .tools
            .into_iter()
            .filter(|tool| {
                tool.get("function")
                    .and_then(|function| function.get("name"))
                    .and_then(|value| value.as_str())
                    != Some(name.as_str())
            })
            .collect();

        self.update_tools(&assistant.id, tools).await?;
        info!(owner = %owner, function = %name, "Tool removed from assistant");
        Ok(())
    }
}
