//! Request assembly: history, system message, tool schemas, filtered parameters.

use serde::Serialize;

use crate::models::{CapabilityRegistry, ParameterKey, ParameterSupport};
use crate::notify::{self, CapabilityWarning, Notification, NotificationSink};
use crate::tools::ToolDefinition;
use crate::types::{ChatMessage, GenerationParameters, ToolChoice};

/// Opaque payload handed to the transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestPayload {
    pub path: String,
    pub body: serde_json::Value,
}

/// Everything one request is built from.
#[derive(Debug, Clone, Copy)]
pub struct RequestParts<'a> {
    pub profile: &'a str,
    pub history: &'a [ChatMessage],
    pub system_message: Option<&'a str>,
    pub tools: &'a [ToolDefinition],
    pub parameters: &'a GenerationParameters,
    /// Overrides `tool_choice` for this request only.
    pub tool_choice_override: Option<&'a ToolChoice>,
    pub stream: bool,
}

/// Builds request payloads, dropping parameters a profile does not accept.
#[derive(Clone)]
pub struct RequestAssembler {
    registry: CapabilityRegistry,
    path: String,
    sink: Option<NotificationSink>,
}

impl RequestAssembler {
    pub fn new(registry: CapabilityRegistry, path: impl Into<String>) -> Self {
        Self {
            registry,
            path: path.into(),
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Option<NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// History as sent: the system message is prepended to a copy unless the
    /// history already starts with one.
    pub fn effective_history(
        history: &[ChatMessage],
        system_message: Option<&str>,
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if let Some(system) = system_message {
            if !history.first().is_some_and(ChatMessage::is_system) {
                messages.push(ChatMessage::system(system));
            }
        }
        messages.extend_from_slice(history);
        messages
    }

    pub fn assemble(&self, parts: &RequestParts<'_>) -> RequestPayload {
        let support = self.registry.supported_parameters(parts.profile);
        let messages: Vec<serde_json::Value> =
            Self::effective_history(parts.history, parts.system_message)
                .iter()
                .map(ChatMessage::to_wire)
                .collect();

        let mut body = serde_json::Map::new();
        body.insert("model".into(), parts.profile.into());
        body.insert("messages".into(), messages.into());
        body.insert("stream".into(), parts.stream.into());

        if !parts.tools.is_empty() && self.permits(&support, ParameterKey::Tools, parts.profile) {
            let tools: Vec<serde_json::Value> =
                parts.tools.iter().map(ToolDefinition::to_wire).collect();
            body.insert(ParameterKey::Tools.wire_name().into(), tools.into());
        }

        for (key, value) in parts.parameters.iter() {
            if key == ParameterKey::ToolChoice && parts.tool_choice_override.is_some() {
                continue;
            }
            if !self.permits(&support, key, parts.profile) {
                continue;
            }
            body.insert(key.wire_name().into(), value.encode(key.kind()));
        }

        // A tool choice with no tools alongside it is rejected by the service.
        let has_tools = body.contains_key(ParameterKey::Tools.wire_name());
        if let Some(choice) = parts.tool_choice_override.filter(|_| has_tools) {
            if support.allows(ParameterKey::ToolChoice) {
                body.insert(ParameterKey::ToolChoice.wire_name().into(), choice.to_value());
            } else if *choice == ToolChoice::None {
                // Without tool_choice, omitting the tools has the same effect.
                body.remove(ParameterKey::Tools.wire_name());
            }
        }

        tracing::debug!(
            profile = parts.profile,
            messages = parts.history.len(),
            tools = parts.tools.len(),
            "assembled request"
        );

        RequestPayload {
            path: self.path.clone(),
            body: serde_json::Value::Object(body),
        }
    }

    fn permits(&self, support: &ParameterSupport<'_>, key: ParameterKey, profile: &str) -> bool {
        if support.allows(key) {
            return true;
        }
        notify::emit(
            self.sink.as_ref(),
            Notification::Capability(CapabilityWarning {
                parameter: key,
                profile: profile.to_string(),
                message: format!("parameter '{key}' is not supported by model '{profile}' and was dropped"),
            }),
        );
        false
    }
}
