//! Non-fatal notifications: dropped parameters and iteration-budget advisories.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::ParameterKey;

/// A parameter the target profile does not accept; it was dropped from the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityWarning {
    pub parameter: ParameterKey,
    pub profile: String,
    pub message: String,
}

/// Advisory conditions reported while an operation continues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Capability(CapabilityWarning),
    /// The final allowed turn is running with tool use disabled.
    IterationBudget { turn: usize, max_iterations: usize },
}

/// Callback receiving notifications.
pub type NotificationSink = Arc<dyn Fn(Notification) + Send + Sync>;

/// Log a notification and forward it to the sink, if any.
pub(crate) fn emit(sink: Option<&NotificationSink>, notification: Notification) {
    match &notification {
        Notification::Capability(w) => tracing::warn!(
            parameter = %w.parameter,
            profile = %w.profile,
            "{}",
            w.message
        ),
        Notification::IterationBudget {
            turn,
            max_iterations,
        } => tracing::warn!(
            turn,
            max_iterations,
            "final agent turn: tool use disabled to force a text answer"
        ),
    }
    if let Some(sink) = sink {
        sink(notification);
    }
}
