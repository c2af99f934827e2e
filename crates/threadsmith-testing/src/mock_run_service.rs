//! A scripted Run Service double.
//!
//! Tests script each turn as the sequence of states its run passes through;
//! `get_run` and `submit_tool_outputs` advance through the sequence and the
//! last state repeats. Everything the coordinator sends (posted messages,
//! submitted output batches) is recorded for assertions.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use threadsmith_core::{AssistantId, RunId, ThreadId};
use threadsmith_runtime::{
    MessageRole, RequiredAction, Run, RunService, RunStatus, ServiceError, ThreadMessage,
    ToolCallRequest, ToolOutput,
};

/// Build a run in the given state with no required action.
pub fn run(id: impl Into<String>, status: RunStatus) -> Run {
    Run {
        id: RunId::new(id.into()),
        thread_id: ThreadId::new("thread_mock"),
        status,
        required_action: None,
    }
}

/// Build a `requires_action` run carrying the given tool-call batch.
pub fn action_run(id: impl Into<String>, calls: Vec<ToolCallRequest>) -> Run {
    Run {
        id: RunId::new(id.into()),
        thread_id: ThreadId::new("thread_mock"),
        status: RunStatus::RequiresAction,
        required_action: Some(RequiredAction::submit_tool_outputs(calls)),
    }
}

#[derive(Default)]
struct MockState {
    pending_turns: VecDeque<Vec<Run>>,
    current: Option<(Vec<Run>, usize)>,
    threads_created: usize,
    posted: Vec<(ThreadId, String)>,
    submissions: Vec<Vec<ToolOutput>>,
    messages: Vec<ThreadMessage>,
}

/// Scripted mock of the Run Service.
#[derive(Default)]
pub struct MockRunService {
    state: Mutex<MockState>,
}

impl MockRunService {
    /// Create a mock with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the state sequence for the next created run.
    pub fn with_turn(self, states: Vec<Run>) -> Self {
        self.state
            .lock()
            .unwrap()
            .pending_turns
            .push_back(states);
        self
    }

    /// Pretend a run is already in flight: the next `list_runs` surfaces it
    /// and the coordinator will attach instead of creating a new run.
    pub fn with_active_run(self, states: Vec<Run>) -> Self {
        self.state.lock().unwrap().current = Some((states, 0));
        self
    }

    /// Set the thread's message list (newest first), as returned once the
    /// run settles.
    pub fn with_messages(self, messages: Vec<ThreadMessage>) -> Self {
        self.state.lock().unwrap().messages = messages;
        self
    }

    /// Convenience: a single assistant message as the newest entry.
    pub fn with_final_reply(self, text: impl Into<String>) -> Self {
        self.with_messages(vec![ThreadMessage::text(
            "msg_final",
            MessageRole::Assistant,
            text,
        )])
    }

    /// Finish the builder.
    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Messages posted by the coordinator, in order.
    pub fn posted_messages(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .posted
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Tool-output batches submitted by the coordinator, in order.
    pub fn submissions(&self) -> Vec<Vec<ToolOutput>> {
        self.state.lock().unwrap().submissions.clone()
    }

    /// Number of threads created.
    pub fn threads_created(&self) -> usize {
        self.state.lock().unwrap().threads_created
    }

    fn advance(&self) -> Result<Run, ServiceError> {
        let mut state = self.state.lock().unwrap();
        let (script, index) = state
            .current
            .as_mut()
            .ok_or_else(|| ServiceError::Api {
                status: 404,
                message: "no run in flight".to_string(),
            })?;
        if *index + 1 < script.len() {
            *index += 1;
        }
        Ok(script[*index].clone())
    }
}

#[async_trait]
impl RunService for MockRunService {
    async fn create_thread(&self) -> Result<ThreadId, ServiceError> {
        let mut state = self.state.lock().unwrap();
        let id = ThreadId::new(format!("thread_{}", state.threads_created));
        state.threads_created += 1;
        Ok(id)
    }

    async fn create_message(
        &self,
        thread_id: &ThreadId,
        role: MessageRole,
        text: &str,
    ) -> Result<ThreadMessage, ServiceError> {
        self.state
            .lock()
            .unwrap()
            .posted
            .push((thread_id.clone(), text.to_string()));
        Ok(ThreadMessage::text("msg_posted", role, text))
    }

    async fn create_run(
        &self,
        _assistant_id: &AssistantId,
        _thread_id: &ThreadId,
    ) -> Result<Run, ServiceError> {
        let mut state = self.state.lock().unwrap();
        let script = state.pending_turns.pop_front().ok_or_else(|| ServiceError::Api {
            status: 500,
            message: "no scripted turn left".to_string(),
        })?;
        let first = script[0].clone();
        state.current = Some((script, 0));
        Ok(first)
    }

    async fn get_run(&self, _thread_id: &ThreadId, _run_id: &RunId) -> Result<Run, ServiceError> {
        self.advance()
    }

    async fn submit_tool_outputs(
        &self,
        _thread_id: &ThreadId,
        _run_id: &RunId,
        outputs: Vec<ToolOutput>,
    ) -> Result<Run, ServiceError> {
        self.state.lock().unwrap().submissions.push(outputs);
        self.advance()
    }

    async fn list_runs(&self, _thread_id: &ThreadId) -> Result<Vec<Run>, ServiceError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .current
            .as_ref()
            .map(|(script, index)| script[*index].clone())
            .filter(|run| run.status.is_active())
            .into_iter()
            .collect())
    }

    async fn list_messages(&self, _thread_id: &ThreadId) -> Result<Vec<ThreadMessage>, ServiceError> {
        Ok(self.state.lock().unwrap().messages.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_run_advances_through_states() {
        let service = MockRunService::new()
            .with_turn(vec![
                run("r1", RunStatus::InProgress),
                run("r1", RunStatus::Completed),
            ])
            .build();

        let thread = service.create_thread().await.unwrap();
        let first = service
            .create_run(&AssistantId::new("asst"), &thread)
            .await
            .unwrap();
        assert_eq!(first.status, RunStatus::InProgress);

        let second = service.get_run(&thread, &first.id).await.unwrap();
        assert_eq!(second.status, RunStatus::Completed);

        // Last state repeats.
        let third = service.get_run(&thread, &first.id).await.unwrap();
        assert_eq!(third.status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn unscripted_create_run_fails() {
        let service = MockRunService::new().build();
        let thread = service.create_thread().await.unwrap();
        let err = service
            .create_run(&AssistantId::new("asst"), &thread)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn active_run_is_listed_until_terminal() {
        let service = MockRunService::new()
            .with_active_run(vec![
                run("r1", RunStatus::InProgress),
                run("r1", RunStatus::Completed),
            ])
            .build();

        let thread = ThreadId::new("thread_mock");
        assert_eq!(service.list_runs(&thread).await.unwrap().len(), 1);

        service.get_run(&thread, &RunId::new("r1")).await.unwrap();
        assert!(service.list_runs(&thread).await.unwrap().is_empty());
    }
}
