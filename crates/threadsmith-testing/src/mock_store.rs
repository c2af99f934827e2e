//! Assistant Store and notifier doubles.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use threadsmith_core::{AssistantId, FunctionName, OwnerKey, ToolSchema};
use threadsmith_runtime::{ActionNotifier, AssistantStore, ServiceError, UiAction};

/// In-memory Assistant Store holding one assistant and its declared tools.
pub struct StaticAssistantStore {
    assistant: Option<AssistantId>,
    tools: Mutex<Vec<ToolSchema>>,
}

impl StaticAssistantStore {
    /// Store with an assistant and no declared tools.
    pub fn new(assistant: impl Into<String>) -> Self {
        Self {
            assistant: Some(AssistantId::new(assistant.into())),
            tools: Mutex::new(Vec::new()),
        }
    }

    /// Store without any assistant, for owner-not-found scenarios.
    pub fn without_assistant() -> Self {
        Self {
            assistant: None,
            tools: Mutex::new(Vec::new()),
        }
    }

    /// Pre-declare a tool schema.
    pub fn with_tool(self, schema: ToolSchema) -> Self {
        self.tools.lock().unwrap().push(schema);
        self
    }

    /// Finish the builder.
    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// The currently declared tool schemas.
    pub fn declared_tools(&self) -> Vec<ToolSchema> {
        self.tools.lock().unwrap().clone()
    }

    /// Whether a tool with the given name is declared.
    pub fn declares(&self, name: &str) -> bool {
        self.tools
            .lock()
            .unwrap()
            .iter()
            .any(|schema| schema.name.as_str() == name)
    }
}

#[async_trait]
impl AssistantStore for StaticAssistantStore {
    async fn find_assistant(&self, _owner: &OwnerKey) -> Result<Option<AssistantId>, ServiceError> {
        Ok(self.assistant.clone())
    }

    async fn list_tool_schemas(&self, _owner: &OwnerKey) -> Result<Vec<ToolSchema>, ServiceError> {
        Ok(self.tools.lock().unwrap().clone())
    }

    async fn publish_tool(&self, _owner: &OwnerKey, schema: &ToolSchema) -> Result<(), ServiceError> {
        let mut tools = self.tools.lock().unwrap();
        if !tools.iter().any(|existing| existing.name == schema.name) {
            tools.push(schema.clone());
        }
        Ok(())
    }

    async fn remove_tool(&self, _owner: &OwnerKey, name: &FunctionName) -> Result<(), ServiceError> {
        self.tools
            .lock()
            .unwrap()
            .retain(|schema| schema.name != *name);
        Ok(())
    }
}

/// Notifier that records every UI action it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    actions: Mutex<Vec<UiAction>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The recorded actions, in order.
    pub fn actions(&self) -> Vec<UiAction> {
        self.actions.lock().unwrap().clone()
    }
}

impl ActionNotifier for RecordingNotifier {
    fn notify(&self, action: UiAction) {
        self.actions.lock().unwrap().push(action);
    }
}
