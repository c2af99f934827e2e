//! UI-action notifications.
//!
//! A tool call whose function name carries the [`UI_ACTION_PREFIX`] marker
//! is a pure signaling action for the surrounding interface: it is never
//! dispatched to the registry. Instead a structured notification is emitted
//! through the [`ActionNotifier`] seam and a trivial success payload stands
//! in as the call's output.

use serde::Serialize;
use tracing::info;

/// Function-name prefix marking a UI signaling action.
pub const UI_ACTION_PREFIX: &str = "ui_";

/// Structured notification for a UI signaling action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiAction {
    pub action: String,
    #[serde(rename = "actionArgs")]
    pub action_args: serde_json::Value,
}

/// Sink for UI action notifications.
pub trait ActionNotifier: Send + Sync {
    /// Emit a notification. Must not block: notifications are side effects
    /// of batch processing and never fail the batch.
    fn notify(&self, action: UiAction);
}

/// Default notifier: logs the action through `tracing`.
pub struct LogNotifier;

impl ActionNotifier for LogNotifier {
    fn notify(&self, action: UiAction) {
        info!(action = %action.action, args = %action.action_args, "UI action requested");
    }
}
