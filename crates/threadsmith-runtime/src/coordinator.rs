//! The per-session run coordination state machine.
//!
//! One user turn flows Idle → Polling → (ActionRequired → Polling)* →
//! Terminal:
//!
//! - **Idle → Polling**: post the user message and create a run — unless the
//!   thread already has an active run, in which case the coordinator
//!   attaches to it and skips message posting.
//! - **Polling**: bounded wait loop; repeated status retrieval at a
//!   configured interval until the run leaves `queued`/`in_progress`, or
//!   the deadline surfaces a timeout.
//! - **ActionRequired**: the run's ordered tool-call batch is turned into
//!   an equally ordered output batch — every call produces exactly one
//!   output, failures encoded as string payloads — and submitted.
//! - **Terminal**: the newest thread message's first text segment is the
//!   turn's reply.

use crate::assistant::AssistantStore;
use crate::config::CoordinatorConfig;
use crate::error::{CoordinatorError, CoordinatorResult};
use crate::notify::{ActionNotifier, LogNotifier, UI_ACTION_PREFIX, UiAction};
use crate::run_service::{MessageRole, Run, RunService, ToolCallRequest, ToolOutput};
use crate::self_extend::{CREATE_FUNCTION_NAME, CreateFunctionTool, create_function_name, create_function_schema};
use crate::session::SessionManager;
use serde::Serialize;
use std::sync::Arc;
use threadsmith_core::{
    FunctionDescriptor, FunctionName, FunctionRegistry, OwnerKey, SessionId, ThreadId,
};
use threadsmith_loader::{FunctionAuthor, FunctionLoader, LoadReport};
use tracing::{debug, error, info, warn};

/// Structured payload used for a tool output that did not come from a
/// successful invocation. Field order is part of the wire contract.
#[derive(Serialize)]
struct StatusPayload {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

fn success_payload() -> String {
    serde_json::to_string(&StatusPayload {
        success: true,
        message: None,
    })
    .expect("status payload serializes")
}

fn not_found_payload() -> String {
    serde_json::to_string(&StatusPayload {
        success: false,
        message: Some("Function not found"),
    })
    .expect("status payload serializes")
}

fn execution_failure_payload() -> String {
    serde_json::to_string(&StatusPayload {
        success: false,
        message: Some("Error executing function"),
    })
    .expect("status payload serializes")
}

fn render_output(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Drives runs to completion and dispatches their tool calls.
///
/// The registry, loader, and remote collaborators are explicit dependencies
/// handed in at construction; the coordinator owns no process-global state.
pub struct RunCoordinator {
    service: Arc<dyn RunService>,
    assistants: Arc<dyn AssistantStore>,
    registry: Arc<FunctionRegistry>,
    loader: Arc<FunctionLoader>,
    author: Arc<FunctionAuthor>,
    sessions: SessionManager,
    notifier: Arc<dyn ActionNotifier>,
    config: CoordinatorConfig,
}

impl RunCoordinator {
    /// Create a coordinator with the default notifier and configuration.
    pub fn new(
        service: Arc<dyn RunService>,
        assistants: Arc<dyn AssistantStore>,
        registry: Arc<FunctionRegistry>,
        loader: Arc<FunctionLoader>,
        author: Arc<FunctionAuthor>,
    ) -> Self {
        let sessions = SessionManager::new(Arc::clone(&service));
        Self {
            service,
            assistants,
            registry,
            loader,
            author,
            sessions,
            notifier: Arc::new(LogNotifier),
            config: CoordinatorConfig::default(),
        }
    }

    /// Replace the UI action notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn ActionNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// The coordinator's function registry.
    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    /// The coordinator's session manager.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Process one user turn to completion and return the assistant's
    /// reply text (empty if the final message carries no text segment).
    pub async fn handle_user_message(
        &self,
        owner: &OwnerKey,
        session: &SessionId,
        text: &str,
    ) -> CoordinatorResult<String> {
        if text.trim().is_empty() {
            return Err(CoordinatorError::EmptyMessage);
        }

        let thread_id = self.sessions.thread_for(session).await?;

        let run = match self.active_run(&thread_id).await? {
            Some(run) => {
                info!(thread = %thread_id, run = %run.id, status = %run.status, "Attaching to active run");
                run
            }
            None => {
                self.service
                    .create_message(&thread_id, MessageRole::User, text)
                    .await?;
                let assistant_id = self
                    .assistants
                    .find_assistant(owner)
                    .await?
                    .ok_or_else(|| CoordinatorError::AssistantNotFound(owner.clone()))?;
                let run = self.service.create_run(&assistant_id, &thread_id).await?;
                debug!(thread = %thread_id, run = %run.id, "Run created");
                run
            }
        };

        let mut run = self.wait_until_settled(&thread_id, run).await?;

        while let Some(calls) = run.tool_calls().map(|calls| calls.to_vec()) {
            debug!(run = %run.id, calls = calls.len(), "Run requires tool outputs");

            let mut outputs = Vec::with_capacity(calls.len());
            for call in &calls {
                let output = self.execute_tool_call(owner, call).await;
                outputs.push(ToolOutput {
                    tool_call_id: call.id.clone(),
                    output,
                });
            }

            let resumed = self
                .service
                .submit_tool_outputs(&thread_id, &run.id, outputs)
                .await?;
            run = self.wait_until_settled(&thread_id, resumed).await?;
        }

        info!(thread = %thread_id, run = %run.id, status = %run.status, "Turn complete");

        let messages = self.service.list_messages(&thread_id).await?;
        Ok(messages
            .first()
            .and_then(|message| message.first_text())
            .unwrap_or_default()
            .to_string())
    }

    /// Register the built-in tools and load every function the owner's
    /// assistant declares. Individual load failures are skipped, not fatal.
    pub async fn load_functions(&self, owner: &OwnerKey) -> CoordinatorResult<LoadReport> {
        for descriptor in self.builtin_descriptors() {
            self.registry
                .register(owner, descriptor.name.clone(), descriptor.callable);
        }

        let declared = self.assistants.list_tool_schemas(owner).await?;
        let names: Vec<FunctionName> = declared
            .into_iter()
            .map(|schema| schema.name)
            .filter(|name| name.as_str() != CREATE_FUNCTION_NAME)
            .collect();

        let report = self.loader.load_all(owner, &names).await;
        for descriptor in &report.loaded {
            self.registry
                .register(owner, descriptor.name.clone(), Arc::clone(&descriptor.callable));
        }

        info!(
            owner = %owner,
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            "Loaded declared functions"
        );
        Ok(report)
    }

    /// Ad-hoc single-function addition: load one module, register it, and
    /// publish its schema. Unlike bulk loading, a failure here surfaces to
    /// the caller.
    pub async fn add_function(
        &self,
        owner: &OwnerKey,
        name: &FunctionName,
    ) -> CoordinatorResult<()> {
        let descriptor = self.loader.load(owner, name).await?;
        self.registry.register(
            owner,
            descriptor.name.clone(),
            Arc::clone(&descriptor.callable),
        );
        self.assistants.publish_tool(owner, &descriptor.schema).await?;
        info!(owner = %owner, function = %name, "Function added");
        Ok(())
    }

    /// Discard the owner's registry and rebuild it from scratch. Reload is
    /// always clear-then-load-all; there is no partial update.
    pub async fn reload_functions(&self, owner: &OwnerKey) -> CoordinatorResult<LoadReport> {
        self.registry.clear(owner);
        self.load_functions(owner).await
    }

    /// Publish the built-in tool schemas to the owner's assistant so the
    /// agent can see them. Publishing an already-declared tool is a no-op.
    pub async fn publish_builtins(&self, owner: &OwnerKey) -> CoordinatorResult<()> {
        for descriptor in self.builtin_descriptors() {
            self.assistants.publish_tool(owner, &descriptor.schema).await?;
        }
        Ok(())
    }

    fn builtin_descriptors(&self) -> Vec<FunctionDescriptor> {
        vec![FunctionDescriptor {
            name: create_function_name(),
            schema: create_function_schema(),
            callable: Arc::new(CreateFunctionTool::new(Arc::clone(&self.author))),
        }]
    }

    async fn active_run(&self, thread_id: &ThreadId) -> CoordinatorResult<Option<Run>> {
        let runs = self.service.list_runs(thread_id).await?;
        Ok(runs.into_iter().find(|run| run.status.is_active()))
    }

    /// Poll until the run leaves `queued`/`in_progress`, bounded by the
    /// configured interval and deadline.
    async fn wait_until_settled(&self, thread_id: &ThreadId, run: Run) -> CoordinatorResult<Run> {
        let deadline = tokio::time::Instant::now() + self.config.poll_deadline;
        let mut current = run;

        while current.status.is_pending() {
            if tokio::time::Instant::now() >= deadline {
                warn!(run = %current.id, deadline = ?self.config.poll_deadline, "Run never settled");
                return Err(CoordinatorError::PollTimeout {
                    run_id: current.id.clone(),
                    deadline: self.config.poll_deadline,
                });
            }
            tokio::time::sleep(self.config.poll_interval).await;
            current = self.service.get_run(thread_id, &current.id).await?;
        }

        debug!(run = %current.id, status = %current.status, "Run settled");
        Ok(current)
    }

    /// Produce the output string for one tool call. Never fails: errors are
    /// encoded as structured payloads so the output batch stays complete.
    async fn execute_tool_call(&self, owner: &OwnerKey, call: &ToolCallRequest) -> String {
        let function_name = call.function.name.as_str();

        if function_name.starts_with(UI_ACTION_PREFIX) {
            let args = serde_json::from_str(&call.function.arguments)
                .unwrap_or(serde_json::Value::Null);
            self.notifier.notify(UiAction {
                action: function_name.to_string(),
                action_args: args,
            });
            return success_payload();
        }

        let name = match FunctionName::parse(function_name) {
            Ok(name) => name,
            Err(err) => {
                warn!(owner = %owner, function = function_name, error = %err, "Unregisterable function name");
                return not_found_payload();
            }
        };

        let Some(callable) = self.registry.lookup(owner, &name) else {
            warn!(owner = %owner, function = %name, "Function not found");
            return not_found_payload();
        };

        let args: serde_json::Value = match serde_json::from_str(&call.function.arguments) {
            Ok(args) => args,
            Err(err) => {
                error!(owner = %owner, function = %name, error = %err, "Tool call arguments are not valid JSON");
                return execution_failure_payload();
            }
        };

        match callable.invoke(args.clone()).await {
            Ok(value) => {
                if name.as_str() == CREATE_FUNCTION_NAME {
                    self.activate_authored_function(owner, &args).await;
                }
                render_output(value)
            }
            Err(err) => {
                error!(owner = %owner, function = %name, error = %err, "Error executing function");
                execution_failure_payload()
            }
        }
    }

    /// Secondary path after a successful `create_new_function` call: load
    /// the new module, register it, and publish its schema. Failures here
    /// are logged only — the creation call already resolved.
    async fn activate_authored_function(&self, owner: &OwnerKey, args: &serde_json::Value) {
        let Some(requested) = args.get("name").and_then(|value| value.as_str()) else {
            return;
        };
        let name = match FunctionName::parse(requested) {
            Ok(name) => name,
            Err(err) => {
                warn!(owner = %owner, function = requested, error = %err, "Authored function has an invalid name");
                return;
            }
        };

        // Let the module write settle before loading it back.
        tokio::time::sleep(self.config.settle_delay).await;

        match self.loader.load(owner, &name).await {
            Ok(descriptor) => {
                self.registry.register(
                    owner,
                    descriptor.name.clone(),
                    Arc::clone(&descriptor.callable),
                );
                match self.assistants.publish_tool(owner, &descriptor.schema).await {
                    Ok(()) => {
                        info!(owner = %owner, function = %name, "Authored function activated")
                    }
                    Err(err) => {
                        warn!(owner = %owner, function = %name, error = %err, "Could not publish schema for authored function")
                    }
                }
            }
            Err(err) => {
                warn!(owner = %owner, function = %name, error = %err, "Authored function could not be activated")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::run_service::{RequiredAction, RunStatus, ThreadMessage};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use threadsmith_core::{AssistantId, RunId, ToolSchema};
    use threadsmith_loader::NullInstaller;

    fn owner() -> OwnerKey {
        OwnerKey::new_unchecked("owner-1")
    }

    fn session() -> SessionId {
        SessionId::new_unchecked("s1")
    }

    fn run_state(status: RunStatus, action: Option<RequiredAction>) -> Run {
        Run {
            id: RunId::new("run_1"),
            thread_id: ThreadId::new("thread_1"),
            status,
            required_action: action,
        }
    }

    /// Run Service double scripted with the sequence of states one run
    /// passes through. `get_run` and `submit_tool_outputs` advance through
    /// the sequence; the last state repeats.
    struct ScriptedService {
        script: Mutex<(Vec<Run>, usize)>,
        attached: bool,
        posted_messages: Mutex<Vec<String>>,
        submissions: Mutex<Vec<Vec<ToolOutput>>>,
        final_messages: Vec<ThreadMessage>,
    }

    impl ScriptedService {
        fn new(script: Vec<Run>, final_messages: Vec<ThreadMessage>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new((script, 0)),
                attached: false,
                posted_messages: Mutex::new(Vec::new()),
                submissions: Mutex::new(Vec::new()),
                final_messages,
            })
        }

        fn attached(script: Vec<Run>, final_messages: Vec<ThreadMessage>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new((script, 0)),
                attached: true,
                posted_messages: Mutex::new(Vec::new()),
                submissions: Mutex::new(Vec::new()),
                final_messages,
            })
        }

        fn advance(&self) -> Run {
            let mut guard = self.script.lock().unwrap();
            let (script, index) = &mut *guard;
            if *index + 1 < script.len() {
                *index += 1;
            }
            script[*index].clone()
        }

        fn current(&self) -> Run {
            let guard = self.script.lock().unwrap();
            guard.0[guard.1].clone()
        }
    }

    #[async_trait]
    impl RunService for ScriptedService {
        async fn create_thread(&self) -> Result<ThreadId, ServiceError> {
            Ok(ThreadId::new("thread_1"))
        }

        async fn create_message(
            &self,
            _thread_id: &ThreadId,
            _role: MessageRole,
            text: &str,
        ) -> Result<ThreadMessage, ServiceError> {
            self.posted_messages.lock().unwrap().push(text.to_string());
            Ok(ThreadMessage::text("msg_user", MessageRole::User, text))
        }

        async fn create_run(
            &self,
            _assistant_id: &AssistantId,
            _thread_id: &ThreadId,
        ) -> Result<Run, ServiceError> {
            Ok(self.current())
        }

        async fn get_run(
            &self,
            _thread_id: &ThreadId,
            _run_id: &RunId,
        ) -> Result<Run, ServiceError> {
            Ok(self.advance())
        }

        async fn submit_tool_outputs(
            &self,
            _thread_id: &ThreadId,
            _run_id: &RunId,
            outputs: Vec<ToolOutput>,
        ) -> Result<Run, ServiceError> {
            self.submissions.lock().unwrap().push(outputs);
            Ok(self.advance())
        }

        async fn list_runs(&self, _thread_id: &ThreadId) -> Result<Vec<Run>, ServiceError> {
            if self.attached {
                Ok(vec![self.current()])
            } else {
                Ok(Vec::new())
            }
        }

        async fn list_messages(
            &self,
            _thread_id: &ThreadId,
        ) -> Result<Vec<ThreadMessage>, ServiceError> {
            Ok(self.final_messages.clone())
        }
    }

    struct StaticStore {
        assistant: Option<AssistantId>,
        tools: Mutex<Vec<ToolSchema>>,
    }

    impl StaticStore {
        fn with_assistant() -> Arc<Self> {
            Arc::new(Self {
                assistant: Some(AssistantId::new("asst_1")),
                tools: Mutex::new(Vec::new()),
            })
        }

        fn empty() -> Arc<Self> {
            Arc::new(Self {
                assistant: None,
                tools: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl AssistantStore for StaticStore {
        async fn find_assistant(
            &self,
            _owner: &OwnerKey,
        ) -> Result<Option<AssistantId>, ServiceError> {
            Ok(self.assistant.clone())
        }

        async fn list_tool_schemas(
            &self,
            _owner: &OwnerKey,
        ) -> Result<Vec<ToolSchema>, ServiceError> {
            Ok(self.tools.lock().unwrap().clone())
        }

        async fn publish_tool(
            &self,
            _owner: &OwnerKey,
            schema: &ToolSchema,
        ) -> Result<(), ServiceError> {
            let mut tools = self.tools.lock().unwrap();
            if !tools.iter().any(|existing| existing.name == schema.name) {
                tools.push(schema.clone());
            }
            Ok(())
        }

        async fn remove_tool(
            &self,
            _owner: &OwnerKey,
            name: &FunctionName,
        ) -> Result<(), ServiceError> {
            self.tools.lock().unwrap().retain(|schema| schema.name != *name);
            Ok(())
        }
    }

    struct RecordingNotifier {
        actions: Mutex<Vec<UiAction>>,
    }

    impl RecordingNotifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                actions: Mutex::new(Vec::new()),
            })
        }
    }

    impl ActionNotifier for RecordingNotifier {
        fn notify(&self, action: UiAction) {
            self.actions.lock().unwrap().push(action);
        }
    }

    fn fast_config() -> CoordinatorConfig {
        CoordinatorConfig::default()
            .with_poll_interval(Duration::from_millis(1))
            .with_poll_deadline(Duration::from_millis(250))
            .with_settle_delay(Duration::from_millis(1))
    }

    fn coordinator_for(
        service: Arc<ScriptedService>,
        store: Arc<StaticStore>,
        functions_dir: &std::path::Path,
    ) -> RunCoordinator {
        RunCoordinator::new(
            service,
            store,
            Arc::new(FunctionRegistry::new()),
            Arc::new(FunctionLoader::new(functions_dir, Arc::new(NullInstaller))),
            Arc::new(FunctionAuthor::new(functions_dir)),
        )
        .with_config(fast_config())
    }

    #[tokio::test]
    async fn plain_turn_returns_terminal_message_text() {
        let dir = tempfile::tempdir().unwrap();
        let service = ScriptedService::new(
            vec![
                run_state(RunStatus::InProgress, None),
                run_state(RunStatus::Completed, None),
            ],
            vec![ThreadMessage::text("msg_1", MessageRole::Assistant, "hi there")],
        );
        let coordinator =
            coordinator_for(Arc::clone(&service), StaticStore::with_assistant(), dir.path());

        let reply = coordinator
            .handle_user_message(&owner(), &session(), "hello")
            .await
            .unwrap();

        assert_eq!(reply, "hi there");
        assert_eq!(*service.posted_messages.lock().unwrap(), vec!["hello"]);
        assert!(service.submissions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let service = ScriptedService::new(vec![run_state(RunStatus::Completed, None)], vec![]);
        let coordinator = coordinator_for(service, StaticStore::with_assistant(), dir.path());

        let err = coordinator
            .handle_user_message(&owner(), &session(), "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::EmptyMessage));
    }

    #[tokio::test]
    async fn missing_assistant_fails_the_turn() {
        let dir = tempfile::tempdir().unwrap();
        let service = ScriptedService::new(vec![run_state(RunStatus::Completed, None)], vec![]);
        let coordinator = coordinator_for(service, StaticStore::empty(), dir.path());

        let err = coordinator
            .handle_user_message(&owner(), &session(), "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::AssistantNotFound(_)));
    }

    #[tokio::test]
    async fn unregistered_function_yields_not_found_output() {
        let dir = tempfile::tempdir().unwrap();
        let calls = vec![ToolCallRequest::function("c1", "ghostFn", "{}")];
        let service = ScriptedService::new(
            vec![
                run_state(
                    RunStatus::RequiresAction,
                    Some(RequiredAction::submit_tool_outputs(calls)),
                ),
                run_state(RunStatus::Completed, None),
            ],
            vec![ThreadMessage::text("msg_1", MessageRole::Assistant, "done")],
        );
        let coordinator =
            coordinator_for(Arc::clone(&service), StaticStore::with_assistant(), dir.path());

        coordinator
            .handle_user_message(&owner(), &session(), "use the ghost")
            .await
            .unwrap();

        let submissions = service.submissions.lock().unwrap();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].len(), 1);
        assert_eq!(submissions[0][0].tool_call_id, "c1");
        assert_eq!(
            submissions[0][0].output,
            r#"{"success":false,"message":"Function not found"}"#
        );
    }

    #[tokio::test]
    async fn batch_outputs_preserve_call_order() {
        let dir = tempfile::tempdir().unwrap();
        let calls = vec![
            ToolCallRequest::function("c1", "ghostFn", "{}"),
            ToolCallRequest::function("c2", "ui_open_panel", r#"{"panel":"settings"}"#),
            ToolCallRequest::function("c3", "alsoMissing", "not json"),
        ];
        let service = ScriptedService::new(
            vec![
                run_state(
                    RunStatus::RequiresAction,
                    Some(RequiredAction::submit_tool_outputs(calls)),
                ),
                run_state(RunStatus::InProgress, None),
                run_state(RunStatus::Completed, None),
            ],
            vec![ThreadMessage::text("msg_1", MessageRole::Assistant, "done")],
        );
        let notifier = RecordingNotifier::new();
        let coordinator =
            coordinator_for(Arc::clone(&service), StaticStore::with_assistant(), dir.path())
                .with_notifier(notifier.clone());

        coordinator
            .handle_user_message(&owner(), &session(), "go")
            .await
            .unwrap();

        let submissions = service.submissions.lock().unwrap();
        let ids: Vec<&str> = submissions[0]
            .iter()
            .map(|output| output.tool_call_id.as_str())
            .collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert_eq!(submissions[0][1].output, r#"{"success":true}"#);

        let actions = notifier.actions.lock().unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action, "ui_open_panel");
        assert_eq!(actions[0].action_args["panel"], "settings");
    }

    #[tokio::test]
    async fn attaches_to_active_run_without_posting() {
        let dir = tempfile::tempdir().unwrap();
        let calls = vec![ToolCallRequest::function("c1", "ghostFn", "{}")];
        let service = ScriptedService::attached(
            vec![
                run_state(
                    RunStatus::RequiresAction,
                    Some(RequiredAction::submit_tool_outputs(calls)),
                ),
                run_state(RunStatus::Completed, None),
            ],
            vec![ThreadMessage::text("msg_1", MessageRole::Assistant, "resumed")],
        );
        let coordinator =
            coordinator_for(Arc::clone(&service), StaticStore::with_assistant(), dir.path());

        let reply = coordinator
            .handle_user_message(&owner(), &session(), "second message")
            .await
            .unwrap();

        assert_eq!(reply, "resumed");
        assert!(
            service.posted_messages.lock().unwrap().is_empty(),
            "attached turns skip message posting"
        );
        assert_eq!(service.submissions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn run_that_never_settles_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let service = ScriptedService::new(
            vec![run_state(RunStatus::InProgress, None)],
            vec![],
        );
        let coordinator = coordinator_for(service, StaticStore::with_assistant(), dir.path())
            .with_config(
                fast_config()
                    .with_poll_interval(Duration::from_millis(1))
                    .with_poll_deadline(Duration::from_millis(15)),
            );

        let err = coordinator
            .handle_user_message(&owner(), &session(), "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::PollTimeout { .. }));
    }

    const AUTHORED_MODULE: &str = r#"
const FUNCTION_NAME = "echoTest";
const FUNCTION_OPTIONS = #{
    "name": "echoTest",
    "description": "Echo the input back",
    "parameters": #{
        "type": "object",
        "properties": #{ "text": #{ "type": "string" } },
        "required": ["text"]
    }
};

fn echoTest(args) { args.text }
"#;

    #[tokio::test]
    async fn self_extension_registers_and_publishes_the_new_function() {
        let dir = tempfile::tempdir().unwrap();
        let arguments = serde_json::json!({ "name": "echoTest", "code": AUTHORED_MODULE });
        let calls = vec![ToolCallRequest::function(
            "c1",
            CREATE_FUNCTION_NAME,
            arguments.to_string(),
        )];
        let service = ScriptedService::new(
            vec![
                run_state(
                    RunStatus::RequiresAction,
                    Some(RequiredAction::submit_tool_outputs(calls)),
                ),
                run_state(RunStatus::Completed, None),
            ],
            vec![ThreadMessage::text("msg_1", MessageRole::Assistant, "created")],
        );
        let store = StaticStore::with_assistant();
        let coordinator =
            coordinator_for(Arc::clone(&service), Arc::clone(&store), dir.path());

        coordinator.load_functions(&owner()).await.unwrap();
        coordinator
            .handle_user_message(&owner(), &session(), "make me an echo tool")
            .await
            .unwrap();

        // The creation call itself succeeded.
        {
            let submissions = service.submissions.lock().unwrap();
            assert!(submissions[0][0].output.contains("Function echoTest created"));
        }

        // The new function is immediately dispatchable.
        let callable = coordinator
            .registry()
            .lookup(&owner(), &FunctionName::new_unchecked("echoTest"))
            .expect("authored function registered");
        let result = callable
            .invoke(serde_json::json!({ "text": "round trip" }))
            .await
            .unwrap();
        assert_eq!(result, serde_json::Value::String("round trip".to_string()));

        // And its schema is published for later turns.
        let published = store.tools.lock().unwrap();
        assert!(published.iter().any(|schema| schema.name.as_str() == "echoTest"));
    }

    #[tokio::test]
    async fn invalid_authored_module_leaves_registry_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let arguments = serde_json::json!({
            "name": "brokenFn",
            "code": "const FUNCTION_NAME = \"brokenFn\";" // no options, no callable
        });
        let calls = vec![ToolCallRequest::function(
            "c1",
            CREATE_FUNCTION_NAME,
            arguments.to_string(),
        )];
        let service = ScriptedService::new(
            vec![
                run_state(
                    RunStatus::RequiresAction,
                    Some(RequiredAction::submit_tool_outputs(calls)),
                ),
                run_state(RunStatus::Completed, None),
            ],
            vec![],
        );
        let coordinator =
            coordinator_for(Arc::clone(&service), StaticStore::with_assistant(), dir.path());

        coordinator.load_functions(&owner()).await.unwrap();
        let before = coordinator.registry().function_names(&owner());

        coordinator
            .handle_user_message(&owner(), &session(), "make a broken tool")
            .await
            .unwrap();

        // Creation resolved (the file was written)...
        let submissions = service.submissions.lock().unwrap();
        assert!(submissions[0][0].output.contains("Function brokenFn created"));
        // ...but activation failed and the registry is as before.
        assert_eq!(coordinator.registry().function_names(&owner()), before);
    }

    #[tokio::test]
    async fn bulk_load_twice_yields_identical_registry() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("echoTest.rhai"), AUTHORED_MODULE).unwrap();

        let service = ScriptedService::new(vec![run_state(RunStatus::Completed, None)], vec![]);
        let store = StaticStore::with_assistant();
        store
            .tools
            .lock()
            .unwrap()
            .push(crate::self_extend::create_function_schema());
        store.tools.lock().unwrap().push(
            ToolSchema::new(FunctionName::new_unchecked("echoTest"), "Echo the input back"),
        );
        let coordinator = coordinator_for(service, store, dir.path());

        coordinator.load_functions(&owner()).await.unwrap();
        let first = coordinator.registry().function_names(&owner());

        coordinator.load_functions(&owner()).await.unwrap();
        let second = coordinator.registry().function_names(&owner());

        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                FunctionName::new_unchecked(CREATE_FUNCTION_NAME),
                FunctionName::new_unchecked("echoTest"),
            ]
        );
    }

    #[tokio::test]
    async fn reload_rebuilds_after_clear() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("echoTest.rhai"), AUTHORED_MODULE).unwrap();

        let service = ScriptedService::new(vec![run_state(RunStatus::Completed, None)], vec![]);
        let store = StaticStore::with_assistant();
        store.tools.lock().unwrap().push(
            ToolSchema::new(FunctionName::new_unchecked("echoTest"), "Echo the input back"),
        );
        let coordinator = coordinator_for(service, store, dir.path());

        coordinator.load_functions(&owner()).await.unwrap();
        let report = coordinator.reload_functions(&owner()).await.unwrap();

        assert_eq!(report.loaded_names(), vec![FunctionName::new_unchecked("echoTest")]);
        assert!(
            coordinator
                .registry()
                .lookup(&owner(), &FunctionName::new_unchecked("echoTest"))
                .is_some()
        );
    }

}
