//! Session bookkeeping: one lazily-created thread per session.

use crate::error::ServiceError;
use crate::run_service::RunService;
use std::collections::HashMap;
use std::sync::Arc;
use threadsmith_core::{SessionId, ThreadId};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Maps opaque session identifiers to conversation threads.
///
/// A thread is created on first reference to a session id and kept for the
/// process lifetime; it is never re-created once assigned. Creation runs
/// under a mutex so two concurrent first references cannot mint two threads
/// for the same session.
pub struct SessionManager {
    service: Arc<dyn RunService>,
    threads: Mutex<HashMap<SessionId, ThreadId>>,
}

impl SessionManager {
    /// Create a manager backed by the given Run Service.
    pub fn new(service: Arc<dyn RunService>) -> Self {
        Self {
            service,
            threads: Mutex::new(HashMap::new()),
        }
    }

    /// Mint a fresh session identifier.
    pub fn new_session_id() -> SessionId {
        SessionId::new_unchecked(Uuid::new_v4().to_string())
    }

    /// Resolve the thread for a session, creating it on first reference.
    pub async fn thread_for(&self, session: &SessionId) -> Result<ThreadId, ServiceError> {
        let mut threads = self.threads.lock().await;
        if let Some(thread) = threads.get(session) {
            return Ok(thread.clone());
        }

        let thread = self.service.create_thread().await?;
        info!(session = %session, thread = %thread, "Created thread for new session");
        threads.insert(session.clone(), thread.clone());
        Ok(thread)
    }

    /// Number of sessions with an assigned thread.
    pub async fn session_count(&self) -> usize {
        self.threads.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_service::{MessageRole, Run, ThreadMessage, ToolOutput};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use threadsmith_core::{AssistantId, RunId};

    /// Counts thread creations; every other method is unreachable in these
    /// tests.
    struct CountingService {
        created: AtomicUsize,
    }

    #[async_trait]
    impl RunService for CountingService {
        async fn create_thread(&self) -> Result<ThreadId, ServiceError> {
            let n = self.created.fetch_add(1, Ordering::SeqCst);
            Ok(ThreadId::new(format!("thread_{n}")))
        }

        async fn create_message(
            &self,
            _thread_id: &ThreadId,
            _role: MessageRole,
            _text: &str,
        ) -> Result<ThreadMessage, ServiceError> {
            unreachable!("not exercised")
        }

        async fn create_run(
            &self,
            _assistant_id: &AssistantId,
            _thread_id: &ThreadId,
        ) -> Result<Run, ServiceError> {
            unreachable!("not exercised")
        }

        async fn get_run(
            &self,
            _thread_id: &ThreadId,
            _run_id: &RunId,
        ) -> Result<Run, ServiceError> {
            unreachable!("not exercised")
        }

        async fn submit_tool_outputs(
            &self,
            _thread_id: &ThreadId,
            _run_id: &RunId,
            _outputs: Vec<ToolOutput>,
        ) -> Result<Run, ServiceError> {
            unreachable!("not exercised")
        }

        async fn list_runs(&self, _thread_id: &ThreadId) -> Result<Vec<Run>, ServiceError> {
            unreachable!("not exercised")
        }

        async fn list_messages(
            &self,
            _thread_id: &ThreadId,
        ) -> Result<Vec<ThreadMessage>, ServiceError> {
            unreachable!("not exercised")
        }
    }

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(CountingService {
            created: AtomicUsize::new(0),
        }))
    }

    #[tokio::test]
    async fn creates_thread_on_first_reference_only() {
        let sessions = manager();
        let session = SessionId::new_unchecked("s1");

        let first = sessions.thread_for(&session).await.unwrap();
        let second = sessions.thread_for(&session).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(sessions.session_count().await, 1);
    }

    #[tokio::test]
    async fn distinct_sessions_get_distinct_threads() {
        let sessions = manager();
        let a = sessions
            .thread_for(&SessionId::new_unchecked("s1"))
            .await
            .unwrap();
        let b = sessions
            .thread_for(&SessionId::new_unchecked("s2"))
            .await
            .unwrap();

        assert_ne!(a, b);
        assert_eq!(sessions.session_count().await, 2);
    }

    #[test]
    fn minted_session_ids_validate() {
        let id = SessionManager::new_session_id();
        assert!(SessionId::parse(id.as_str()).is_ok());
    }
}
