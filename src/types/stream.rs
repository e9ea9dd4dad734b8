//! Events reconstructed from the wire stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::message::ToolCall;

/// A typed event emitted by the stream parser.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental assistant text, emitted as soon as it arrives.
    TextDelta(String),
    /// Every tool call finalized during the stream, ordered by parallel index.
    ToolCalls(Vec<ToolCall>),
    /// Usage quota reported by the service.
    Quota(QuotaInfo),
    /// Why generation stopped.
    Finish(FinishReason),
    /// Task-channel metadata.
    Task(TaskMetadata),
}

/// Why generation finished.
#[derive(Debug, Clone, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    #[strum(to_string = "tool_calls", serialize = "function_call", serialize = "tool_use")]
    ToolCalls,
    ContentFilter,
    #[strum(default)]
    Other(String),
}

impl FinishReason {
    /// Whether this reason closes a tool-call batch.
    pub fn closes_tool_batch(&self) -> bool {
        matches!(self, Self::ToolCalls)
    }
}

/// Quota information attached to a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotaInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_at: Option<DateTime<Utc>>,
}

/// Metadata records only carried on the task-execution channel.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskMetadata {
    Execution(serde_json::Value),
    FunctionCall(serde_json::Value),
    Unknown(serde_json::Value),
}
