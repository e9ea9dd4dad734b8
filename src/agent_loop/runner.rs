//! The agent: request/parse cycles and the automatic tool loop.

use std::sync::Arc;
use std::time::Duration;

use bon::bon;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::{WeaveConfig, DEFAULT_CHAT_PATH};
use crate::error::{Result, WeaveError};
use crate::models::CapabilityRegistry;
use crate::notify::{self, Notification, NotificationSink};
use crate::provider::{HttpTransport, RequestAssembler, RequestParts, Transport};
use crate::stream::{parse_stream, EventStream, MalformedRecordPolicy, StreamChannel, StreamParser};
use crate::tools::{ConcurrentToolExecutor, ToolDefinition, ToolExecutor, ToolOutcome};
use crate::types::{ChatMessage, GenerationParameters, ToolCall, ToolChoice};
use crate::util::timeout::with_cancel;

use super::session::AgentSession;
use super::types::{AgentRunResult, RunLimits, ToolChoiceMode, TurnOutcome, FALLBACK_MESSAGE};

/// A configured model endpoint plus its tool library.
///
/// ```no_run
/// # async fn demo(transport: std::sync::Arc<dyn weave::provider::Transport>) -> weave::Result<()> {
/// use weave::prelude::*;
///
/// let agent = Agent::builder()
///     .transport(transport)
///     .profile("gpt-4o")
///     .system_message("Be brief.")
///     .build()?;
/// let result = agent.run(vec![ChatMessage::user("What is 2+2?")]).await?;
/// println!("{}", result.text);
/// # Ok(())
/// # }
/// ```
pub struct Agent {
    transport: Arc<dyn Transport>,
    assembler: RequestAssembler,
    profile: String,
    system_message: Option<String>,
    tools: Vec<ToolDefinition>,
    parameters: GenerationParameters,
    executor: Arc<dyn ToolExecutor>,
    /// Batch deadline applied around a caller-supplied executor.
    batch_deadline: Option<Duration>,
    limits: RunLimits,
    notification_sink: Option<NotificationSink>,
    cancel: Option<CancellationToken>,
    channel: StreamChannel,
    malformed_policy: MalformedRecordPolicy,
}

#[bon]
impl Agent {
    #[builder]
    pub fn new(
        transport: Arc<dyn Transport>,
        #[builder(into)] profile: String,
        registry: Option<CapabilityRegistry>,
        #[builder(into)] system_message: Option<String>,
        #[builder(default)] tools: Vec<ToolDefinition>,
        #[builder(default)] parameters: GenerationParameters,
        /// Runs tool batches. Defaults to a [`ConcurrentToolExecutor`] that
        /// applies `limits.tool_batch_timeout` per call; a custom executor
        /// gets the same deadline around the whole batch.
        executor: Option<Arc<dyn ToolExecutor>>,
        #[builder(default)] limits: RunLimits,
        notification_sink: Option<NotificationSink>,
        cancel: Option<CancellationToken>,
        #[builder(default)] channel: StreamChannel,
        #[builder(default)] malformed_policy: MalformedRecordPolicy,
        #[builder(into, default = DEFAULT_CHAT_PATH.to_string())] chat_path: String,
    ) -> Result<Self> {
        if limits.max_iterations == 0 {
            return Err(WeaveError::Validation(
                "max_iterations must be at least 1".into(),
            ));
        }
        if profile.trim().is_empty() {
            return Err(WeaveError::Validation("model profile must not be empty".into()));
        }
        let mut names = std::collections::HashSet::new();
        if let Some(dup) = tools.iter().find(|t| !names.insert(t.name())) {
            return Err(WeaveError::Validation(format!(
                "duplicate tool name '{}'",
                dup.name()
            )));
        }

        let batch_deadline = executor.as_ref().and(limits.tool_batch_timeout);
        let executor = executor.unwrap_or_else(|| {
            let executor = ConcurrentToolExecutor::new();
            Arc::new(match limits.tool_batch_timeout {
                Some(timeout) => executor.with_batch_timeout(timeout),
                None => executor,
            })
        });
        let registry = registry.unwrap_or_else(|| CapabilityRegistry::builtin().clone());
        let assembler =
            RequestAssembler::new(registry, chat_path).with_sink(notification_sink.clone());

        Ok(Self {
            transport,
            assembler,
            profile,
            system_message,
            tools,
            parameters,
            executor,
            batch_deadline,
            limits,
            notification_sink,
            cancel,
            channel,
            malformed_policy,
        })
    }
}

impl Agent {
    /// Agent over an [`HttpTransport`] built from `config`.
    pub fn from_config(config: &WeaveConfig, tools: Vec<ToolDefinition>) -> Result<Self> {
        let transport = HttpTransport::from_config(config)?;
        Agent::builder()
            .transport(Arc::new(transport))
            .profile(config.model.clone())
            .maybe_system_message(config.system_message.clone())
            .tools(tools)
            .limits(config.limits)
            .chat_path(config.chat_path.clone())
            .build()
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn limits(&self) -> &RunLimits {
        &self.limits
    }

    pub(crate) fn cancel_token(&self) -> Option<&CancellationToken> {
        self.cancel.as_ref()
    }

    /// One request/parse cycle over `history`.
    pub async fn stream(&self, history: &[ChatMessage], mode: ToolChoiceMode) -> Result<EventStream> {
        let none = ToolChoice::None;
        let payload = self.assembler.assemble(&RequestParts {
            profile: &self.profile,
            history,
            system_message: self.system_message.as_deref(),
            tools: &self.tools,
            parameters: &self.parameters,
            tool_choice_override: match mode {
                ToolChoiceMode::Auto => None,
                ToolChoiceMode::ForceText => Some(&none),
            },
            stream: true,
        });

        let bytes = with_cancel(
            self.cancel.as_ref(),
            self.transport.send(&payload.path, &payload.body),
        )
        .await?;
        let parser = StreamParser::new()
            .with_channel(self.channel)
            .with_policy(self.malformed_policy);
        Ok(parse_stream(bytes, parser))
    }

    /// Start a manually driven session over `history`.
    pub fn session(&self, history: Vec<ChatMessage>) -> AgentSession<'_> {
        AgentSession::new(self, history)
    }

    /// Run turns until the model answers in text or the budget runs out.
    ///
    /// The last allowed turn disables tool use. If the model still asks for
    /// tools on that turn, the calls are not executed and the run ends with
    /// [`FALLBACK_MESSAGE`].
    pub async fn run(&self, history: Vec<ChatMessage>) -> Result<AgentRunResult> {
        let run_id = Uuid::new_v4();
        let max_iterations = self.limits.max_iterations;
        let mut session = self.session(history);
        tracing::debug!(%run_id, profile = %self.profile, max_iterations, "agent run start");

        for turn in 1..=max_iterations {
            let mode = if turn == max_iterations {
                notify::emit(
                    self.notification_sink.as_ref(),
                    Notification::IterationBudget {
                        turn,
                        max_iterations,
                    },
                );
                ToolChoiceMode::ForceText
            } else {
                ToolChoiceMode::Auto
            };

            match session.advance(mode).await? {
                TurnOutcome::Text(response) => {
                    tracing::debug!(%run_id, turn, "agent run finished with text");
                    return Ok(AgentRunResult {
                        text: response.text,
                        history: response.history,
                        turns: session.turns(),
                        budget_exhausted: false,
                    });
                }
                TurnOutcome::ToolRequest(request) if turn == max_iterations => {
                    tracing::warn!(
                        %run_id,
                        turn,
                        calls = request.calls.len(),
                        "tool calls on the final turn were not executed"
                    );
                }
                TurnOutcome::ToolRequest(request) => {
                    let outcomes = with_cancel(self.cancel.as_ref(), async {
                        Ok(self.execute_batch(&request.calls).await)
                    })
                    .await?;
                    session.resume(outcomes)?;
                }
            }
        }

        tracing::debug!(%run_id, "agent run exhausted its iteration budget");
        let turns = session.turns();
        Ok(AgentRunResult {
            text: FALLBACK_MESSAGE.to_string(),
            history: session.into_history(),
            turns,
            budget_exhausted: true,
        })
    }
}

impl Agent {
    async fn execute_batch(&self, calls: &[ToolCall]) -> Vec<ToolOutcome> {
        let execution = self.executor.execute(calls, &self.tools);
        let Some(timeout) = self.batch_deadline else {
            return execution.await;
        };
        match tokio::time::timeout(timeout, execution).await {
            Ok(outcomes) => outcomes,
            Err(_) => {
                tracing::warn!(
                    calls = calls.len(),
                    timeout_ms = timeout.as_millis() as u64,
                    "tool batch deadline elapsed"
                );
                calls
                    .iter()
                    .map(|call| {
                        ToolOutcome::failure(
                            call,
                            format!("Tool '{}' timed out after {}ms", call.name, timeout.as_millis()),
                        )
                    })
                    .collect()
            }
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("profile", &self.profile)
            .field("tools", &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>())
            .field("limits", &self.limits)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}
