//! # Threadsmith OpenAI
//!
//! [`OpenAiClient`] implements the runtime's [`RunService`] and
//! [`AssistantStore`] boundaries against an OpenAI-compatible Assistants v2
//! REST surface. Assistants are partitioned by owner key through the
//! `metadata.created_by` convention.
//!
//! [`RunService`]: threadsmith_runtime::RunService
//! [`AssistantStore`]: threadsmith_runtime::AssistantStore

pub mod client;
pub mod wire;

pub use client::{
    API_KEY_ENV, AssistantOptions, ConfigError, DEFAULT_BASE_URL, OpenAiClient, OpenAiConfig,
};
