//! Agent events to UI message stream parts, encoded as server-sent events.

use crate::agent::{AgentEvent, FinishReason};
use crate::error::Result;
use axum::response::sse::Event;
use serde::Serialize;
use serde_json::Value;

/// Terminator line sent after the last part.
pub const DONE: &str = "[DONE]";

/// One part of the UI message stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamPart {
    #[serde(rename_all = "camelCase")]
    Start { message_id: String },
    StartStep,
    TextStart { id: String },
    TextDelta { id: String, delta: String },
    TextEnd { id: String },
    #[serde(rename_all = "camelCase")]
    ToolInputAvailable {
        tool_call_id: String,
        tool_name: String,
        input: Value,
    },
    #[serde(rename_all = "camelCase")]
    ToolOutputAvailable { tool_call_id: String, output: Value },
    FinishStep,
    /// Carries the structured reason; [`normalize_finish_reason`] flattens it
    /// before it reaches the wire.
    #[serde(rename_all = "camelCase")]
    Finish { finish_reason: FinishReason },
    #[serde(rename_all = "camelCase")]
    Error { error_text: String },
}

/// Converts a run's agent events into stream parts.
#[derive(Debug)]
pub struct StreamEncoder {
    message_id: String,
    text_blocks: usize,
}

impl StreamEncoder {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            text_blocks: 0,
        }
    }

    /// Opening part of the stream.
    pub fn start(&self) -> StreamPart {
        StreamPart::Start {
            message_id: self.message_id.clone(),
        }
    }

    pub fn encode(&mut self, event: AgentEvent) -> Vec<StreamPart> {
        match event {
            AgentEvent::StepStarted { .. } => vec![StreamPart::StartStep],
            AgentEvent::TextDelta { text } => {
                self.text_blocks += 1;
                let id = format!("{}-text-{}", self.message_id, self.text_blocks);
                vec![
                    StreamPart::TextStart { id: id.clone() },
                    StreamPart::TextDelta {
                        id: id.clone(),
                        delta: text,
                    },
                    StreamPart::TextEnd { id },
                ]
            }
            AgentEvent::ToolCallRequested {
                call_id,
                tool_name,
                input,
            } => vec![StreamPart::ToolInputAvailable {
                tool_call_id: call_id,
                tool_name,
                input,
            }],
            AgentEvent::ToolResult { call_id, result, .. } => vec![StreamPart::ToolOutputAvailable {
                tool_call_id: call_id,
                output: result.payload,
            }],
            AgentEvent::StepFinished { .. } => vec![StreamPart::FinishStep],
            AgentEvent::Finished { finish_reason, .. } => vec![StreamPart::Finish { finish_reason }],
            AgentEvent::Error { message } => vec![StreamPart::Error { error_text: message }],
        }
    }
}

/// Rewrite a `finish` part whose `finishReason` is a structured object into
/// its unified string code, `stop` when absent. Other parts pass through.
pub fn normalize_finish_reason(mut part: Value) -> Value {
    if part.get("type").and_then(Value::as_str) != Some("finish") {
        return part;
    }

    let unified = match part.get("finishReason") {
        Some(Value::Object(reason)) => reason
            .get("unified")
            .and_then(Value::as_str)
            .unwrap_or("stop")
            .to_string(),
        Some(Value::String(reason)) => reason.clone(),
        _ => "stop".to_string(),
    };
    part["finishReason"] = Value::String(unified);
    part
}

/// Wire JSON for a part.
pub fn part_json(part: &StreamPart) -> Result<Value> {
    Ok(normalize_finish_reason(serde_json::to_value(part)?))
}

/// Server-sent event for a part.
pub fn sse_event(part: &StreamPart) -> Result<Event> {
    Ok(Event::default().data(part_json(part)?.to_string()))
}

/// Final `[DONE]` event.
pub fn done_event() -> Event {
    Event::default().data(DONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolResult;
    use serde_json::json;

    #[test]
    fn test_structured_finish_reason_is_flattened() {
        let part = StreamPart::Finish {
            finish_reason: FinishReason::new("tool-calls", Some("tool_calls")),
        };
        assert_eq!(
            part_json(&part).unwrap(),
            json!({ "type": "finish", "finishReason": "tool-calls" })
        );
    }

    #[test]
    fn test_normalize_finish_reason_defaults() {
        assert_eq!(
            normalize_finish_reason(json!({ "type": "finish" })),
            json!({ "type": "finish", "finishReason": "stop" })
        );
        assert_eq!(
            normalize_finish_reason(json!({ "type": "finish", "finishReason": { "raw": "x" } })),
            json!({ "type": "finish", "finishReason": "stop" })
        );
        assert_eq!(
            normalize_finish_reason(json!({ "type": "finish", "finishReason": "length" })),
            json!({ "type": "finish", "finishReason": "length" })
        );

        let other = json!({ "type": "text-delta", "id": "t", "delta": "hi", "finishReason": { "unified": "x" } });
        assert_eq!(normalize_finish_reason(other.clone()), other);
    }

    #[test]
    fn test_encoder_maps_events() {
        let mut encoder = StreamEncoder::new("msg");
        assert_eq!(part_json(&encoder.start()).unwrap(), json!({ "type": "start", "messageId": "msg" }));

        let parts = encoder.encode(AgentEvent::TextDelta {
            text: "Hello".to_string(),
        });
        assert_eq!(parts.len(), 3);
        assert_eq!(
            part_json(&parts[1]).unwrap(),
            json!({ "type": "text-delta", "id": "msg-text-1", "delta": "Hello" })
        );

        let parts = encoder.encode(AgentEvent::ToolCallRequested {
            call_id: "c1".to_string(),
            tool_name: "youtubeSearch".to_string(),
            input: json!({ "query": "sql" }),
        });
        assert_eq!(
            part_json(&parts[0]).unwrap(),
            json!({
                "type": "tool-input-available",
                "toolCallId": "c1",
                "toolName": "youtubeSearch",
                "input": { "query": "sql" }
            })
        );

        let parts = encoder.encode(AgentEvent::ToolResult {
            call_id: "c1".to_string(),
            tool_name: "youtubeSearch".to_string(),
            result: ToolResult::failure("no key"),
        });
        assert_eq!(part_json(&parts[0]).unwrap()["output"]["success"], json!(false));

        let parts = encoder.encode(AgentEvent::StepStarted { step: 1 });
        assert_eq!(part_json(&parts[0]).unwrap(), json!({ "type": "start-step" }));

        let parts = encoder.encode(AgentEvent::Error {
            message: "timed out".to_string(),
        });
        assert_eq!(
            part_json(&parts[0]).unwrap(),
            json!({ "type": "error", "errorText": "timed out" })
        );
    }
}
