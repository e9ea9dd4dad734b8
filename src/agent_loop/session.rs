//! Explicit turn state machine: `advance` runs a model turn, `resume` feeds
//! tool results back.

use futures::StreamExt;

use crate::error::{Result, WeaveError};
use crate::tools::ToolOutcome;
use crate::types::{ChatMessage, QuotaInfo, StreamEvent, ToolCall};
use crate::util::timeout::{with_cancel, with_timeout};

use super::runner::Agent;
use super::types::{AgentState, AgentTextResponse, AgentToolRequest, ToolChoiceMode, TurnOutcome};

/// One conversation driven turn by turn.
///
/// History only grows: every turn appends, nothing is reordered or dropped.
#[derive(Debug)]
pub struct AgentSession<'a> {
    agent: &'a Agent,
    history: Vec<ChatMessage>,
    state: AgentState,
    turns: usize,
    quota: Option<QuotaInfo>,
}

struct CollectedTurn {
    text: String,
    calls: Vec<ToolCall>,
}

impl<'a> AgentSession<'a> {
    pub(crate) fn new(agent: &'a Agent, history: Vec<ChatMessage>) -> Self {
        Self {
            agent,
            history,
            state: AgentState::AwaitingModel,
            turns: 0,
            quota: None,
        }
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn into_history(self) -> Vec<ChatMessage> {
        self.history
    }

    /// Model turns started so far.
    pub fn turns(&self) -> usize {
        self.turns
    }

    /// Most recent quota report from the service.
    pub fn last_quota(&self) -> Option<&QuotaInfo> {
        self.quota.as_ref()
    }

    /// Run one model turn.
    pub async fn advance(&mut self, mode: ToolChoiceMode) -> Result<TurnOutcome> {
        if self.state != AgentState::AwaitingModel {
            return Err(WeaveError::InvalidState(format!(
                "advance called while {:?}",
                self.state
            )));
        }

        self.turns += 1;
        let turn = self.turns;
        tracing::debug!(
            profile = self.agent.profile(),
            turn,
            history = self.history.len(),
            ?mode,
            "agent turn start"
        );

        let collect = self.collect(mode);
        let collected = match self.agent.limits().turn_timeout {
            Some(timeout) => with_cancel(self.agent.cancel_token(), with_timeout(timeout, collect)).await,
            None => with_cancel(self.agent.cancel_token(), collect).await,
        };
        let (collected, quota) = collected?;
        if quota.is_some() {
            self.quota = quota;
        }

        tracing::debug!(
            turn,
            text_len = collected.text.len(),
            tool_calls = collected.calls.len(),
            "agent turn complete"
        );

        if collected.calls.is_empty() {
            self.history.push(ChatMessage::assistant(collected.text.clone()));
            self.state = AgentState::Finalized;
            return Ok(TurnOutcome::Text(AgentTextResponse {
                text: collected.text,
                history: self.history.clone(),
            }));
        }

        self.state = AgentState::AwaitingToolResults {
            pending: collected.calls.clone(),
        };
        Ok(TurnOutcome::ToolRequest(AgentToolRequest {
            calls: collected.calls,
        }))
    }

    /// Record one result per pending call, in call order.
    ///
    /// Each call adds two history entries: the assistant's call, then its
    /// result (the value on success, an `{"error": ...}` object on failure).
    pub fn resume(&mut self, mut results: Vec<ToolOutcome>) -> Result<()> {
        let AgentState::AwaitingToolResults { pending } = &self.state else {
            return Err(WeaveError::InvalidState(format!(
                "resume called while {:?}",
                self.state
            )));
        };

        if results.len() != pending.len() {
            return Err(WeaveError::InvalidState(format!(
                "expected {} tool results, got {}",
                pending.len(),
                results.len()
            )));
        }

        let mut ordered = Vec::with_capacity(pending.len());
        for call in pending {
            let Some(pos) = results.iter().position(|r| r.tool_call_id == call.id) else {
                return Err(WeaveError::InvalidState(format!(
                    "no result for tool call '{}' ({})",
                    call.id, call.name
                )));
            };
            ordered.push((call.clone(), results.swap_remove(pos)));
        }

        for (call, outcome) in ordered {
            if !outcome.success {
                tracing::debug!(tool = %call.name, call_id = %call.id, "recording failed tool result");
            }
            let result = ChatMessage::tool_result(&call, outcome.history_payload(), !outcome.success);
            self.history.push(ChatMessage::tool_call(call));
            self.history.push(result);
        }
        self.state = AgentState::AwaitingModel;
        Ok(())
    }

    async fn collect(&self, mode: ToolChoiceMode) -> Result<(CollectedTurn, Option<QuotaInfo>)> {
        let mut events = self.agent.stream(&self.history, mode).await?;
        let mut turn = CollectedTurn {
            text: String::new(),
            calls: Vec::new(),
        };
        let mut quota = None;

        while let Some(event) = events.next().await {
            match event? {
                StreamEvent::TextDelta(text) => turn.text.push_str(&text),
                StreamEvent::ToolCalls(calls) => turn.calls.extend(calls),
                StreamEvent::Quota(info) => {
                    tracing::debug!(remaining = ?info.remaining, limit = ?info.limit, "quota reported");
                    quota = Some(info);
                }
                StreamEvent::Finish(reason) => tracing::debug!(%reason, "finish signal"),
                StreamEvent::Task(meta) => tracing::debug!(?meta, "task metadata"),
            }
        }
        Ok((turn, quota))
    }
}
