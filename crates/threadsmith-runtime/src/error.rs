//! Runtime error types.

use std::time::Duration;
use threadsmith_core::{OwnerKey, RunId};

/// Failure talking to a remote collaborator (Run Service or Assistant
/// Store). None of these are retried by the runtime; they abort the current
/// operation.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("service returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("invalid response payload: {0}")]
    Decode(String),
}

/// Failure of a single coordinated turn.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// The caller submitted an empty message.
    #[error("message content must be non-empty")]
    EmptyMessage,

    /// No assistant definition exists for the owner key.
    #[error("no assistant found for owner '{0}'")]
    AssistantNotFound(OwnerKey),

    /// The run did not leave its pending states within the poll deadline.
    #[error("run '{run_id}' did not settle within {deadline:?}")]
    PollTimeout { run_id: RunId, deadline: Duration },

    /// A remote call failed; the turn is aborted.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// An explicitly requested module load failed (ad-hoc addition). Bulk
    /// loads never surface this — their failures are per-function isolated.
    #[error(transparent)]
    Loader(#[from] threadsmith_loader::LoaderError),
}

/// Result type alias for coordinator operations.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
