//! Shared test helpers and a scripted transport.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};

use weave::error::WeaveError;
use weave::notify::{Notification, NotificationSink};
use weave::provider::{ByteStream, Transport};

/// A request the transport received.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub path: String,
    pub body: Value,
}

/// Replays canned response bodies, one per request, in the queued chunks.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Vec<Bytes>>>,
    requests: Mutex<Vec<CapturedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a response delivered as one chunk.
    pub fn push_body(&self, body: impl Into<String>) {
        self.push_chunks(vec![Bytes::from(body.into())]);
    }

    /// Queue a response delivered in several chunks.
    pub fn push_chunks(&self, chunks: Vec<Bytes>) {
        self.responses.lock().unwrap().push_back(chunks);
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, path: &str, body: &Value) -> Result<ByteStream, WeaveError> {
        self.requests.lock().unwrap().push(CapturedRequest {
            path: path.to_string(),
            body: body.clone(),
        });
        let chunks = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| WeaveError::api(500, "scripted transport exhausted"))?;
        Ok(Box::pin(futures::stream::iter(
            chunks.into_iter().map(Ok::<_, WeaveError>),
        )))
    }
}

/// A transport whose response never arrives.
pub struct HangingTransport;

#[async_trait]
impl Transport for HangingTransport {
    async fn send(&self, _path: &str, _body: &Value) -> Result<ByteStream, WeaveError> {
        futures::future::pending::<()>().await;
        unreachable!()
    }
}

/// Frame records as `data:` lines followed by the end sentinel.
pub fn sse(records: &[Value]) -> String {
    let mut body = String::new();
    for record in records {
        body.push_str("data: ");
        body.push_str(&record.to_string());
        body.push_str("\n\n");
    }
    body.push_str("data: [DONE]\n\n");
    body
}

pub fn content(text: &str) -> Value {
    json!({ "type": "content", "content": text })
}

pub fn tool_fragment(index: u32, id: Option<&str>, name: Option<&str>, arguments: &str) -> Value {
    let mut record = json!({ "type": "tool_call", "index": index, "arguments": arguments });
    if let Some(id) = id {
        record["id"] = json!(id);
    }
    if let Some(name) = name {
        record["name"] = json!(name);
    }
    record
}

pub fn finish(reason: &str) -> Value {
    json!({ "type": "finish", "reason": reason })
}

/// A complete text answer.
pub fn text_response(text: &str) -> String {
    sse(&[content(text), finish("stop")])
}

/// A single complete tool call.
pub fn tool_call_response(id: &str, name: &str, arguments: Value) -> String {
    sse(&[
        tool_fragment(0, Some(id), Some(name), &arguments.to_string()),
        finish("tool_calls"),
    ])
}

/// Sink that records every notification.
pub fn collecting_sink() -> (NotificationSink, Arc<Mutex<Vec<Notification>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = seen.clone();
    let sink: NotificationSink = Arc::new(move |n| sink_seen.lock().unwrap().push(n));
    (sink, seen)
}

/// Split `body` into pieces of at most `size` bytes, ignoring char boundaries.
pub fn byte_chunks(body: &str, size: usize) -> Vec<Bytes> {
    body.as_bytes()
        .chunks(size)
        .map(Bytes::copy_from_slice)
        .collect()
}
