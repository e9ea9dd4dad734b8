//! Incremental stream parser: raw chunks in, typed events out.

use std::collections::BTreeMap;

use futures::StreamExt;
use uuid::Uuid;

use super::wire::{classify_line, decode_record, Line, ToolCallFragment, WireRecord};
use super::EventStream;
use crate::error::{Result, WeaveError};
use crate::provider::ByteStream;
use crate::types::{FinishReason, StreamEvent, ToolCall};

/// Which logical channel a stream belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamChannel {
    /// Chat completions; task metadata records are ignored.
    #[default]
    Chat,
    /// Task execution; task metadata records surface as events.
    Task,
}

/// What to do with a record that fails structural decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedRecordPolicy {
    /// Fail the stream with a protocol error.
    #[default]
    Abort,
    /// Log and drop the record.
    Skip,
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

impl PartialToolCall {
    fn merge(&mut self, fragment: ToolCallFragment) {
        if self.id.is_none() {
            self.id = fragment.id.filter(|id| !id.is_empty());
        }
        if self.name.is_none() {
            self.name = fragment.name.filter(|name| !name.is_empty());
        }
        if let Some(args) = fragment.arguments {
            self.arguments.push_str(&args);
        }
    }
}

/// Per-stream state machine.
///
/// Text deltas are emitted as soon as their line completes. Tool-call
/// fragments are grouped by parallel index and released, ordered by index,
/// as a single [`StreamEvent::ToolCalls`] once the stream ends.
///
/// ```
/// use weave::stream::StreamParser;
/// use weave::types::StreamEvent;
///
/// let mut parser = StreamParser::new();
/// let mut events = parser.feed(b"data: {\"type\":\"content\",\"content\":\"4\"}\n").unwrap();
/// events.extend(parser.finish().unwrap());
/// assert_eq!(events, vec![StreamEvent::TextDelta("4".into())]);
/// ```
#[derive(Debug, Default)]
pub struct StreamParser {
    channel: StreamChannel,
    policy: MalformedRecordPolicy,
    buffer: Vec<u8>,
    in_flight: BTreeMap<u32, PartialToolCall>,
    finalized: Vec<ToolCall>,
    done: bool,
    finished: bool,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, channel: StreamChannel) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_policy(mut self, policy: MalformedRecordPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Whether the termination sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Consume one raw chunk. Lines may span chunk boundaries.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>> {
        let mut events = Vec::new();
        if self.done {
            return Ok(events);
        }
        self.buffer.extend_from_slice(chunk);
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.process_line(&line[..line.len() - 1], &mut events)?;
            if self.done {
                self.buffer.clear();
                break;
            }
        }
        Ok(events)
    }

    /// Signal end of input: parse any unterminated last line, flush
    /// in-flight fragments, and emit the aggregated tool calls.
    pub fn finish(&mut self) -> Result<Vec<StreamEvent>> {
        let mut events = Vec::new();
        if self.finished {
            return Ok(events);
        }
        self.finished = true;
        if !self.done && !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.process_line(&line, &mut events)?;
        }
        if !self.in_flight.is_empty() {
            tracing::debug!(
                pending = self.in_flight.len(),
                "stream ended with unflushed tool-call fragments"
            );
            self.flush_in_flight()?;
        }
        if !self.finalized.is_empty() {
            events.push(StreamEvent::ToolCalls(std::mem::take(&mut self.finalized)));
        }
        Ok(events)
    }

    fn process_line(&mut self, raw: &[u8], events: &mut Vec<StreamEvent>) -> Result<()> {
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line,
            Err(_) => {
                return self.malformed(&String::from_utf8_lossy(raw), "line is not valid UTF-8")
            }
        };
        let payload = match classify_line(line) {
            Line::Ignored => return Ok(()),
            Line::Done => {
                self.done = true;
                return Ok(());
            }
            Line::Data(payload) => payload,
        };
        let record = match decode_record(payload) {
            Ok(record) => record,
            Err(message) => return self.malformed(line, &message),
        };

        match record {
            WireRecord::Content(text) => {
                if !text.is_empty() {
                    events.push(StreamEvent::TextDelta(text));
                }
            }
            WireRecord::ToolCall(fragment) => {
                self.in_flight.entry(fragment.index).or_default().merge(fragment);
            }
            WireRecord::Finish(reason) => {
                let reason: FinishReason = reason.parse().unwrap_or(FinishReason::Other(reason));
                if reason.closes_tool_batch() {
                    self.flush_in_flight()?;
                }
                events.push(StreamEvent::Finish(reason));
            }
            WireRecord::Quota(quota) => events.push(StreamEvent::Quota(quota)),
            WireRecord::Task(meta) => {
                if self.channel == StreamChannel::Task {
                    events.push(StreamEvent::Task(meta));
                }
            }
            WireRecord::Unrecognized(kind) => {
                tracing::debug!(kind = %kind, "ignoring unrecognized stream record");
            }
        }
        Ok(())
    }

    /// Move in-flight calls, ordered by index, into the finalized list.
    fn flush_in_flight(&mut self) -> Result<()> {
        for (index, partial) in std::mem::take(&mut self.in_flight) {
            match finalize_call(index, partial) {
                Ok(call) => self.finalized.push(call),
                Err(message) => self.malformed(&format!("tool_call index {index}"), &message)?,
            }
        }
        Ok(())
    }

    fn malformed(&self, line: &str, message: &str) -> Result<()> {
        match self.policy {
            MalformedRecordPolicy::Abort => Err(WeaveError::stream_protocol(line, message)),
            MalformedRecordPolicy::Skip => {
                tracing::warn!(line = %line, error = %message, "skipping malformed stream record");
                Ok(())
            }
        }
    }
}

fn finalize_call(index: u32, partial: PartialToolCall) -> std::result::Result<ToolCall, String> {
    let name = partial
        .name
        .ok_or_else(|| format!("tool call at index {index} never received a name"))?;
    let id = partial
        .id
        .unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple()));
    let arguments = if partial.arguments.trim().is_empty() {
        "{}".to_string()
    } else {
        partial.arguments
    };
    if let Err(e) = serde_json::from_str::<serde_json::Value>(&arguments) {
        return Err(format!(
            "tool call '{name}' has incomplete arguments: {e}"
        ));
    }
    Ok(ToolCall {
        id,
        name,
        arguments,
    })
}

/// Drive a parser over a byte stream, yielding events in arrival order.
pub fn parse_stream(mut bytes: ByteStream, mut parser: StreamParser) -> EventStream {
    let stream = async_stream::stream! {
        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            match parser.feed(&chunk) {
                Ok(events) => {
                    for event in events {
                        yield Ok(event);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
            if parser.is_done() {
                break;
            }
        }
        match parser.finish() {
            Ok(events) => {
                for event in events {
                    yield Ok(event);
                }
            }
            Err(e) => yield Err(e),
        }
    };
    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn data(json: &str) -> String {
        format!("data: {json}\n")
    }

    fn tool_fragment(index: u32, id: Option<&str>, name: Option<&str>, args: &str) -> String {
        let mut record = serde_json::json!({ "type": "tool_call", "index": index, "arguments": args });
        if let Some(id) = id {
            record["id"] = id.into();
        }
        if let Some(name) = name {
            record["name"] = name.into();
        }
        data(&record.to_string())
    }

    fn run(parser: &mut StreamParser, chunks: &[&str]) -> Result<Vec<StreamEvent>> {
        let mut events = Vec::new();
        for chunk in chunks {
            events.extend(parser.feed(chunk.as_bytes())?);
        }
        events.extend(parser.finish()?);
        Ok(events)
    }

    #[test]
    fn reassembles_split_arguments() {
        let original = r#"{"city":"Paris","units":"metric"}"#;
        for split in 1..original.len() {
            let (a, b) = original.split_at(split);
            let input = [
                tool_fragment(0, Some("call_1"), Some("get_weather"), a),
                tool_fragment(0, None, None, b),
                data(r#"{"type":"finish","reason":"tool_calls"}"#),
            ]
            .concat();
            let events = run(&mut StreamParser::new(), &[&input]).unwrap();
            let Some(StreamEvent::ToolCalls(calls)) = events.last() else {
                panic!("expected tool calls, got {events:?}");
            };
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].arguments, original);
        }
    }

    #[test]
    fn orders_calls_by_index_not_arrival() {
        let input = [
            tool_fragment(2, Some("c2"), Some("t2"), "{}"),
            tool_fragment(0, Some("c0"), Some("t0"), "{}"),
            tool_fragment(1, Some("c1"), Some("t1"), "{}"),
            data(r#"{"type":"finish","reason":"tool_calls"}"#),
        ]
        .concat();
        let events = run(&mut StreamParser::new(), &[&input]).unwrap();
        let ids: Vec<String> = events
            .iter()
            .find_map(|e| match e {
                StreamEvent::ToolCalls(calls) => Some(calls.iter().map(|c| c.id.clone()).collect()),
                _ => None,
            })
            .unwrap();
        assert_eq!(ids, vec!["c0", "c1", "c2"]);
    }

    #[test]
    fn id_and_name_are_retained_from_first_fragment() {
        let input = [
            tool_fragment(0, Some("first"), Some("alpha"), "{\"a\":"),
            tool_fragment(0, Some("second"), Some("beta"), "1}"),
        ]
        .concat();
        let events = run(&mut StreamParser::new(), &[&input]).unwrap();
        assert_eq!(
            events,
            vec![StreamEvent::ToolCalls(vec![ToolCall::new("first", "alpha", "{\"a\":1}")])]
        );
    }

    #[test]
    fn lines_can_span_chunks_including_utf8() {
        let line = data(r#"{"type":"content","content":"héllo"}"#);
        let bytes = line.as_bytes();
        let split = line.find('é').unwrap() + 1;
        let mut parser = StreamParser::new();
        let mut events = parser.feed(&bytes[..split]).unwrap();
        assert!(events.is_empty());
        events.extend(parser.feed(&bytes[split..]).unwrap());
        assert_eq!(events, vec![StreamEvent::TextDelta("héllo".into())]);
    }

    #[test]
    fn sentinel_stops_parsing() {
        let input = [
            data(r#"{"type":"content","content":"a"}"#),
            "data: [DONE]\n".to_string(),
            data(r#"{"type":"content","content":"b"}"#),
        ]
        .concat();
        let mut parser = StreamParser::new();
        let events = run(&mut parser, &[&input]).unwrap();
        assert!(parser.is_done());
        assert_eq!(events, vec![StreamEvent::TextDelta("a".into())]);
    }

    #[test]
    fn multiple_batches_accumulate_into_one_event() {
        let input = [
            tool_fragment(0, Some("a"), Some("one"), "{}"),
            data(r#"{"type":"finish","reason":"tool_calls"}"#),
            tool_fragment(0, Some("b"), Some("two"), "{}"),
            data(r#"{"type":"finish","reason":"function_call"}"#),
        ]
        .concat();
        let events = run(&mut StreamParser::new(), &[&input]).unwrap();
        let tool_events: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, StreamEvent::ToolCalls(_)))
            .collect();
        assert_eq!(tool_events.len(), 1);
        let StreamEvent::ToolCalls(calls) = tool_events[0] else { unreachable!() };
        assert_eq!(calls.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn missing_id_is_generated() {
        let input = tool_fragment(0, None, Some("ping"), "");
        let events = run(&mut StreamParser::new(), &[&input]).unwrap();
        let StreamEvent::ToolCalls(calls) = &events[0] else { panic!("{events:?}") };
        assert!(calls[0].id.starts_with("call_"));
        assert_eq!(calls[0].arguments, "{}");
    }

    #[test]
    fn malformed_record_aborts_by_default() {
        let input = "data: {broken\n";
        let err = run(&mut StreamParser::new(), &[input]).unwrap_err();
        assert!(matches!(err, WeaveError::StreamProtocol { .. }));
    }

    #[test]
    fn malformed_record_can_be_skipped() {
        let input = [
            "data: {broken\n".to_string(),
            data(r#"{"type":"content","content":"ok"}"#),
        ]
        .concat();
        let mut parser = StreamParser::new().with_policy(MalformedRecordPolicy::Skip);
        let events = run(&mut parser, &[&input]).unwrap();
        assert_eq!(events, vec![StreamEvent::TextDelta("ok".into())]);
    }

    #[test]
    fn incomplete_arguments_are_a_protocol_error() {
        let input = [
            tool_fragment(0, Some("x"), Some("t"), "{\"a\":"),
            data(r#"{"type":"finish","reason":"tool_calls"}"#),
        ]
        .concat();
        let err = run(&mut StreamParser::new(), &[&input]).unwrap_err();
        assert!(matches!(err, WeaveError::StreamProtocol { ref message, .. } if message.contains("incomplete")));
    }

    #[test]
    fn task_metadata_only_on_task_channel() {
        let input = [
            data(r#"{"type":"execution","status":"running"}"#),
            data(r#"{"type":"function_call","name":"f"}"#),
        ]
        .concat();
        assert!(run(&mut StreamParser::new(), &[&input]).unwrap().is_empty());

        let mut parser = StreamParser::new().with_channel(StreamChannel::Task);
        let events = run(&mut parser, &[&input]).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], StreamEvent::Task(crate::types::TaskMetadata::Execution(_))));
    }

    #[tokio::test]
    async fn parse_stream_adapts_byte_streams() {
        let chunks: Vec<Result<bytes::Bytes>> = vec![
            Ok(bytes::Bytes::from_static(b"data: {\"type\":\"content\",\"con")),
            Ok(bytes::Bytes::from_static(b"tent\":\"4\"}\ndata: {\"type\":\"finish\",\"reason\":\"stop\"}\n")),
            Ok(bytes::Bytes::from_static(b"data: [DONE]\n")),
        ];
        let events: Vec<_> = parse_stream(Box::pin(futures::stream::iter(chunks)), StreamParser::new())
            .collect()
            .await;
        let events: Vec<StreamEvent> = events.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta("4".into()),
                StreamEvent::Finish(FinishReason::Stop),
            ]
        );
    }
}
