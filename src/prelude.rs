//! Convenience re-exports for common use.

pub use crate::agent_loop::{
    Agent, AgentRunResult, AgentSession, AgentState, RunLimits, ToolChoiceMode, TurnOutcome,
    FALLBACK_MESSAGE,
};
pub use crate::config::WeaveConfig;
pub use crate::error::{Result, WeaveError};
pub use crate::models::{CapabilityRegistry, ParameterKey, ParameterSet};
pub use crate::notify::{Notification, NotificationSink};
pub use crate::provider::{HttpTransport, Transport};
pub use crate::stream::{EventStream, StreamParser};
pub use crate::tools::{ToolArguments, ToolDefinition, ToolExecutor, ToolOutcome, ToolParameters};
pub use crate::types::{ChatMessage, GenerationParameters, StreamEvent, ToolCall, ToolChoice};
