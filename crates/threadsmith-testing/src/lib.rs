//! # Threadsmith Testing
//!
//! Mock collaborators for exercising the Threadsmith runtime without a
//! remote service: a scripted [`MockRunService`], an in-memory
//! [`StaticAssistantStore`], and a [`RecordingNotifier`]. All of them record
//! what the coordinator sends so tests can assert on ordering and payloads.

pub mod mock_run_service;
pub mod mock_store;

pub use mock_run_service::{MockRunService, action_run, run};
pub use mock_store::{RecordingNotifier, StaticAssistantStore};
