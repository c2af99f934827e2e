//! The Run Service interface boundary and its wire types.
//!
//! The Run Service is the remote collaborator that owns threads, runs, and
//! messages. The types here mirror its wire shapes; unknown fields are
//! ignored on decode so the runtime stays compatible with richer payloads.

use crate::error::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use threadsmith_core::{AssistantId, RunId, ThreadId};

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Completed,
    Failed,
    Cancelled,
    Cancelling,
}

impl RunStatus {
    /// Still being worked on by the service; keep polling.
    pub fn is_pending(&self) -> bool {
        matches!(self, RunStatus::Queued | RunStatus::InProgress)
    }

    /// Terminal: anything that is neither pending nor awaiting tool outputs.
    pub fn is_terminal(&self) -> bool {
        !self.is_pending() && !matches!(self, RunStatus::RequiresAction)
    }

    /// Counts as the thread's active run when deciding whether to attach
    /// instead of creating a new one.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RunStatus::RequiresAction
                | RunStatus::Queued
                | RunStatus::InProgress
                | RunStatus::Cancelling
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Cancelling => "cancelling",
        };
        write!(f, "{name}")
    }
}

/// The function half of a tool call: which function, with which arguments.
/// `arguments` is the raw JSON text produced by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// One requested tool invocation, consumed exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    #[serde(rename = "type", default = "function_call_type")]
    pub kind: String,
    pub function: FunctionCall,
}

fn function_call_type() -> String {
    "function".to_string()
}

impl ToolCallRequest {
    /// Build a function tool call.
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: function_call_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitToolOutputsAction {
    pub tool_calls: Vec<ToolCallRequest>,
}

/// The action a `requires_action` run is waiting on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub submit_tool_outputs: SubmitToolOutputsAction,
}

impl RequiredAction {
    pub const SUBMIT_TOOL_OUTPUTS: &'static str = "submit_tool_outputs";

    /// Build a submit-tool-outputs action.
    pub fn submit_tool_outputs(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            kind: Self::SUBMIT_TOOL_OUTPUTS.to_string(),
            submit_tool_outputs: SubmitToolOutputsAction { tool_calls },
        }
    }

    pub fn is_submit_tool_outputs(&self) -> bool {
        self.kind == Self::SUBMIT_TOOL_OUTPUTS
    }
}

/// One execution attempt of the agent against a thread's latest message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub thread_id: ThreadId,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_action: Option<RequiredAction>,
}

impl Run {
    /// The ordered tool-call batch, when this run is waiting on tool
    /// outputs.
    pub fn tool_calls(&self) -> Option<&[ToolCallRequest]> {
        self.required_action
            .as_ref()
            .filter(|action| action.is_submit_tool_outputs())
            .map(|action| action.submit_tool_outputs.tool_calls.as_slice())
    }
}

/// The result of one tool call, keyed back to its request id.
///
/// Every call in a batch produces exactly one output, failures included, so
/// the service never stalls waiting for a missing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

/// Author role of a thread message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub value: String,
}

/// One content segment of a message. Only text segments are consumed by
/// this runtime; other kinds decode to `Unsupported` and are skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextContent },
    #[serde(other)]
    Unsupported,
}

/// A message in a conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<MessageContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl ThreadMessage {
    /// Build a plain-text message.
    pub fn text(id: impl Into<String>, role: MessageRole, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: vec![MessageContent::Text {
                text: TextContent {
                    value: value.into(),
                },
            }],
            created_at: None,
        }
    }

    /// First text segment, if the message has one.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|part| match part {
            MessageContent::Text { text } => Some(text.value.as_str()),
            MessageContent::Unsupported => None,
        })
    }
}

/// The remote conversational-run service.
///
/// Every method is a network call that may fail; the runtime performs no
/// retries — a failure aborts the operation that needed it.
#[async_trait]
pub trait RunService: Send + Sync {
    /// Create a new conversation thread.
    async fn create_thread(&self) -> Result<ThreadId, ServiceError>;

    /// Append a message to a thread.
    async fn create_message(
        &self,
        thread_id: &ThreadId,
        role: MessageRole,
        text: &str,
    ) -> Result<ThreadMessage, ServiceError>;

    /// Start a run of the assistant against the thread's latest message.
    async fn create_run(
        &self,
        assistant_id: &AssistantId,
        thread_id: &ThreadId,
    ) -> Result<Run, ServiceError>;

    /// Fetch the current state of a run.
    async fn get_run(&self, thread_id: &ThreadId, run_id: &RunId) -> Result<Run, ServiceError>;

    /// Submit the ordered output batch for a `requires_action` run.
    async fn submit_tool_outputs(
        &self,
        thread_id: &ThreadId,
        run_id: &RunId,
        outputs: Vec<ToolOutput>,
    ) -> Result<Run, ServiceError>;

    /// List the thread's runs, most recent first.
    async fn list_runs(&self, thread_id: &ThreadId) -> Result<Vec<Run>, ServiceError>;

    /// List the thread's messages, newest first.
    async fn list_messages(&self, thread_id: &ThreadId) -> Result<Vec<ThreadMessage>, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(RunStatus::Queued.is_pending());
        assert!(RunStatus::InProgress.is_pending());
        assert!(!RunStatus::RequiresAction.is_pending());

        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
        assert!(RunStatus::Cancelling.is_terminal());
        assert!(!RunStatus::RequiresAction.is_terminal());

        assert!(RunStatus::Cancelling.is_active());
        assert!(!RunStatus::Completed.is_active());
    }

    #[test]
    fn run_decodes_from_wire_payload() {
        let payload = serde_json::json!({
            "id": "run_1",
            "thread_id": "thread_1",
            "status": "requires_action",
            "model": "ignored-extra-field",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "personSearch", "arguments": "{\"query\":\"Ada\"}" }
                    }]
                }
            }
        });

        let run: Run = serde_json::from_value(payload).unwrap();
        assert_eq!(run.status, RunStatus::RequiresAction);
        let calls = run.tool_calls().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "personSearch");
    }

    #[test]
    fn tool_calls_requires_the_submit_kind() {
        let run = Run {
            id: RunId::new("run_1"),
            thread_id: ThreadId::new("thread_1"),
            status: RunStatus::RequiresAction,
            required_action: Some(RequiredAction {
                kind: "something_else".to_string(),
                submit_tool_outputs: SubmitToolOutputsAction { tool_calls: vec![] },
            }),
        };
        assert!(run.tool_calls().is_none());
    }

    #[test]
    fn message_skips_non_text_segments() {
        let payload = serde_json::json!({
            "id": "msg_1",
            "role": "assistant",
            "content": [
                { "type": "image_file", "image_file": { "file_id": "file_1" } },
                { "type": "text", "text": { "value": "hello there" } }
            ]
        });

        let message: ThreadMessage = serde_json::from_value(payload).unwrap();
        assert_eq!(message.first_text(), Some("hello there"));
    }

    #[test]
    fn message_without_text_yields_none() {
        let message = ThreadMessage {
            id: "msg_1".to_string(),
            role: MessageRole::Assistant,
            content: vec![MessageContent::Unsupported],
            created_at: None,
        };
        assert_eq!(message.first_text(), None);
    }
}
