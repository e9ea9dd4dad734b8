//! Core types for the agent loop.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{ChatMessage, ToolCall};

/// Text returned by [`Agent::run`](super::Agent::run) when the iteration
/// budget runs out before the model produces an answer.
pub const FALLBACK_MESSAGE: &str =
    "I wasn't able to finish this request within the allowed number of steps.";

pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Bounds on one agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    /// Model turns allowed per run; the last one is forced to answer in text.
    pub max_iterations: usize,
    /// Deadline for one request/parse cycle.
    pub turn_timeout: Option<Duration>,
    /// Deadline for one tool batch. Calls still running when it passes
    /// are recorded as failures.
    pub tool_batch_timeout: Option<Duration>,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            turn_timeout: None,
            tool_batch_timeout: None,
        }
    }
}

impl RunLimits {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = Some(timeout);
        self
    }

    pub fn with_tool_batch_timeout(mut self, timeout: Duration) -> Self {
        self.tool_batch_timeout = Some(timeout);
        self
    }
}

/// Tool policy for one model turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoiceMode {
    /// Send the configured tool choice unchanged.
    #[default]
    Auto,
    /// Disable tool use so the model must answer in text.
    ForceText,
}

/// Where an [`AgentSession`](super::AgentSession) is in its protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentState {
    AwaitingModel,
    AwaitingToolResults { pending: Vec<ToolCall> },
    Finalized,
}

/// The model asked for tools; results must be supplied before the next turn.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentToolRequest {
    pub calls: Vec<ToolCall>,
}

/// The model answered in text.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentTextResponse {
    pub text: String,
    /// Full history, ending with the assistant answer.
    pub history: Vec<ChatMessage>,
}

/// Outcome of one model turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    ToolRequest(AgentToolRequest),
    Text(AgentTextResponse),
}

/// Result of [`Agent::run`](super::Agent::run).
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRunResult {
    pub text: String,
    pub history: Vec<ChatMessage>,
    /// Model turns taken.
    pub turns: usize,
    /// True when the run ended with [`FALLBACK_MESSAGE`].
    pub budget_exhausted: bool,
}
