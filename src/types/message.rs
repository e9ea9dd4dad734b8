//! Conversation messages and tool calls.

use base64::Engine;
use serde::{Deserialize, Serialize};

/// A tool call requested by the model.
///
/// `arguments` is the raw JSON text exactly as reassembled from the stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parse the argument text as JSON.
    pub fn parsed_arguments(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.arguments)
    }
}

/// A single entry in a conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatMessage {
    User {
        content: String,
    },
    System {
        content: String,
    },
    Assistant {
        content: String,
    },
    AssistantToolCall {
        call: ToolCall,
    },
    ToolResult {
        tool_call_id: String,
        name: String,
        content: serde_json::Value,
        #[serde(default)]
        is_error: bool,
    },
    Media {
        mime_type: String,
        /// Base64-encoded payload.
        data: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::User {
            content: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::System {
            content: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Assistant {
            content: text.into(),
        }
    }

    pub fn tool_call(call: ToolCall) -> Self {
        Self::AssistantToolCall { call }
    }

    pub fn tool_result(call: &ToolCall, content: serde_json::Value, is_error: bool) -> Self {
        Self::ToolResult {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            content,
            is_error,
        }
    }

    /// Media message from raw bytes.
    pub fn media(mime_type: impl Into<String>, bytes: &[u8], caption: Option<String>) -> Self {
        Self::Media {
            mime_type: mime_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            caption,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Self::System { .. })
    }

    /// Wire representation of this message.
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            Self::User { content } => serde_json::json!({ "role": "user", "content": content }),
            Self::System { content } => serde_json::json!({ "role": "system", "content": content }),
            Self::Assistant { content } => {
                serde_json::json!({ "role": "assistant", "content": content })
            }
            Self::AssistantToolCall { call } => serde_json::json!({
                "role": "assistant",
                "content": serde_json::Value::Null,
                "tool_calls": [{
                    "id": call.id,
                    "type": "function",
                    "function": { "name": call.name, "arguments": call.arguments },
                }],
            }),
            Self::ToolResult {
                tool_call_id,
                name,
                content,
                ..
            } => {
                let content = match content {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                serde_json::json!({
                    "role": "tool",
                    "tool_call_id": tool_call_id,
                    "name": name,
                    "content": content,
                })
            }
            Self::Media {
                mime_type,
                data,
                caption,
            } => {
                let mut parts = Vec::new();
                if let Some(caption) = caption {
                    parts.push(serde_json::json!({ "type": "text", "text": caption }));
                }
                parts.push(serde_json::json!({
                    "type": "image_url",
                    "image_url": { "url": format!("data:{mime_type};base64,{data}") },
                }));
                serde_json::json!({ "role": "user", "content": parts })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_result_wire_shape_stringifies_values() {
        let call = ToolCall::new("call_1", "get_weather", r#"{"city":"Paris"}"#);
        let msg = ChatMessage::tool_result(&call, serde_json::json!({"temp": 21}), false);
        let wire = msg.to_wire();
        assert_eq!(wire["role"], "tool");
        assert_eq!(wire["tool_call_id"], "call_1");
        assert_eq!(wire["content"], r#"{"temp":21}"#);
    }

    #[test]
    fn assistant_tool_call_keeps_raw_arguments() {
        let call = ToolCall::new("call_1", "get_weather", r#"{"city":"Paris"}"#);
        let wire = ChatMessage::tool_call(call).to_wire();
        assert_eq!(
            wire["tool_calls"][0]["function"]["arguments"],
            r#"{"city":"Paris"}"#
        );
    }

    #[test]
    fn media_is_base64_encoded() {
        let msg = ChatMessage::media("image/png", b"abc", None);
        match msg {
            ChatMessage::Media { data, .. } => assert_eq!(data, "YWJj"),
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
