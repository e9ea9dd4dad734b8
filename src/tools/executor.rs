//! Batch tool execution.

use std::time::Duration;

use async_trait::async_trait;
use futures::future;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::arguments::ToolArguments;
use super::tool::{ToolDefinition, ToolExecutionContext};
use crate::types::ToolCall;

/// Result of executing one tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub tool_call_id: String,
    pub name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutcome {
    pub fn success(call: &ToolCall, value: serde_json::Value) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            success: true,
            value: Some(value),
            error: None,
        }
    }

    pub fn failure(call: &ToolCall, error: impl Into<String>) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            success: false,
            value: None,
            error: Some(error.into()),
        }
    }

    /// Payload recorded in the tool-result history entry.
    pub fn history_payload(&self) -> serde_json::Value {
        if self.success {
            self.value.clone().unwrap_or(serde_json::Value::Null)
        } else {
            serde_json::json!({
                "error": self.error.clone().unwrap_or_else(|| "tool execution failed".to_string()),
                "tool": self.name,
            })
        }
    }
}

/// Executes a batch of tool calls against a tool library.
///
/// Implementations return exactly one outcome per call, in call order.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, calls: &[ToolCall], tools: &[ToolDefinition]) -> Vec<ToolOutcome>;
}

/// Runs every call in a batch concurrently and waits for all of them.
#[derive(Debug, Clone, Default)]
pub struct ConcurrentToolExecutor {
    batch_timeout: Option<Duration>,
}

impl ConcurrentToolExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls still running when the deadline passes become failures.
    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl ToolExecutor for ConcurrentToolExecutor {
    async fn execute(&self, calls: &[ToolCall], tools: &[ToolDefinition]) -> Vec<ToolOutcome> {
        let deadline = self.batch_timeout.map(|t| (Instant::now() + t, t));
        let futures = calls.iter().map(|call| async move {
            match deadline {
                Some((at, timeout)) => {
                    match tokio::time::timeout_at(at, execute_tool_call(call, tools)).await {
                        Ok(outcome) => outcome,
                        Err(_) => ToolOutcome::failure(
                            call,
                            format!("Tool '{}' timed out after {}ms", call.name, timeout.as_millis()),
                        ),
                    }
                }
                None => execute_tool_call(call, tools).await,
            }
        });
        future::join_all(futures).await
    }
}

/// Execute a single call; every failure is folded into the outcome.
pub async fn execute_tool_call(call: &ToolCall, tools: &[ToolDefinition]) -> ToolOutcome {
    let Some(tool) = tools.iter().find(|t| t.name() == call.name) else {
        return ToolOutcome::failure(call, format!("Tool '{}' not found", call.name));
    };
    let args = match ToolArguments::parse(&call.arguments) {
        Ok(args) => args,
        Err(e) => return ToolOutcome::failure(call, e.to_string()),
    };
    let ctx = ToolExecutionContext {
        tool_call_id: Some(call.id.clone()),
        tool_name: Some(call.name.clone()),
    };
    match tool.tool().execute(&args, &ctx).await {
        Ok(value) => ToolOutcome::success(call, value),
        Err(e) => {
            tracing::debug!(tool = %call.name, call_id = %call.id, error = %e, "tool execution failed");
            ToolOutcome::failure(call, e.to_string())
        }
    }
}
