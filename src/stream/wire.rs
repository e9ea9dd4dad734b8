//! Wire grammar: line framing and record decoding.

use serde::Deserialize;

use crate::types::{QuotaInfo, TaskMetadata};

/// Marker prefixing every payload-carrying line.
pub const DATA_PREFIX: &str = "data:";
/// Payload value that terminates the stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Classification of one protocol line.
#[derive(Debug, PartialEq)]
pub(crate) enum Line<'a> {
    /// Blank, comment, or any line without the data marker.
    Ignored,
    Done,
    Data(&'a str),
}

pub(crate) fn classify_line(line: &str) -> Line<'_> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Line::Ignored;
    };
    let payload = payload.strip_prefix(' ').unwrap_or(payload).trim_end();
    if payload == DONE_SENTINEL {
        Line::Done
    } else if payload.is_empty() {
        Line::Ignored
    } else {
        Line::Data(payload)
    }
}

#[derive(Debug, Deserialize, PartialEq)]
pub(crate) struct ToolCallFragment {
    pub index: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentRecord {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FinishRecord {
    #[serde(default)]
    reason: Option<String>,
}

/// A decoded payload record.
#[derive(Debug, PartialEq)]
pub(crate) enum WireRecord {
    Content(String),
    ToolCall(ToolCallFragment),
    Finish(String),
    Quota(QuotaInfo),
    Task(TaskMetadata),
    /// Well-formed record of a kind this client does not know.
    Unrecognized(String),
}

/// Decode one payload. `Err` carries a description of the structural failure.
pub(crate) fn decode_record(payload: &str) -> Result<WireRecord, String> {
    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| format!("invalid JSON: {e}"))?;
    let kind = value
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or_else(|| "missing 'type' discriminator".to_string())?
        .to_string();

    let record = match kind.as_str() {
        "content" => {
            let record: ContentRecord = from_value(value, &kind)?;
            WireRecord::Content(record.content.unwrap_or_default())
        }
        "tool_call" => WireRecord::ToolCall(from_value(value, &kind)?),
        "finish" => {
            let record: FinishRecord = from_value(value, &kind)?;
            WireRecord::Finish(record.reason.unwrap_or_default())
        }
        "quota" => WireRecord::Quota(from_value(value, &kind)?),
        "execution" => WireRecord::Task(TaskMetadata::Execution(value)),
        "function_call" => WireRecord::Task(TaskMetadata::FunctionCall(value)),
        "unknown" => WireRecord::Task(TaskMetadata::Unknown(value)),
        _ => WireRecord::Unrecognized(kind),
    };
    Ok(record)
}

fn from_value<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
    kind: &str,
) -> Result<T, String> {
    serde_json::from_value(value).map_err(|e| format!("invalid '{kind}' record: {e}"))
}
