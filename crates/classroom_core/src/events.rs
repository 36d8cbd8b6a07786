//! crates/classroom_core/src/events.rs
//!
//! Defines the JSON events exchanged with the realtime service over the data
//! channel. Every event is an object tagged by its `type` field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single message on the data channel, inbound or outbound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Local receive/send time, `HH:MM:SS`. The remote side never sets it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub body: EventBody,
}

impl RealtimeEvent {
    pub fn new(body: EventBody) -> Self {
        Self {
            event_id: None,
            timestamp: None,
            body,
        }
    }

    /// A bare `response.create`, asking the model to take its turn.
    pub fn response_create() -> Self {
        Self::new(EventBody::ResponseCreate { response: None })
    }

    /// A `response.create` carrying turn-specific instructions.
    pub fn response_create_with(instructions: impl Into<String>) -> Self {
        Self::new(EventBody::ResponseCreate {
            response: Some(ResponseParams {
                instructions: Some(instructions.into()),
            }),
        })
    }

    /// Reports the result of a tool call back to the model.
    pub fn function_call_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::new(EventBody::ConversationItemCreate {
            item: ConversationItem {
                kind: ItemKind::FunctionCallOutput,
                role: None,
                content: None,
                call_id: Some(call_id.into()),
                output: Some(output.into()),
            },
        })
    }

    /// A typed user message.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(EventBody::ConversationItemCreate {
            item: ConversationItem {
                kind: ItemKind::Message,
                role: Some(Role::User),
                content: Some(vec![serde_json::json!({
                    "type": "input_text",
                    "text": text.into(),
                })]),
                call_id: None,
                output: None,
            },
        })
    }

    /// Microphone audio, base64-encoded PCM16.
    pub fn audio_append(audio: String) -> Self {
        Self::new(EventBody::InputAudioBufferAppend { audio })
    }

    /// The `type` tag of this event, for logging.
    pub fn kind(&self) -> &'static str {
        self.body.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventBody {
    #[serde(rename = "session.created")]
    SessionCreated {
        #[serde(default)]
        session: Value,
    },
    #[serde(rename = "session.update")]
    SessionUpdate { session: Value },
    #[serde(rename = "session.updated")]
    SessionUpdated {
        #[serde(default)]
        session: Value,
    },
    #[serde(rename = "response.create")]
    ResponseCreate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<ResponseParams>,
    },
    #[serde(rename = "response.created")]
    ResponseCreated {
        #[serde(default)]
        response: Value,
    },
    #[serde(rename = "response.done")]
    ResponseDone { response: ResponseBody },
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: ConversationItem },
    #[serde(rename = "response.audio_transcript.delta")]
    AudioTranscriptDelta {
        #[serde(default)]
        delta: String,
    },
    #[serde(rename = "response.audio.done")]
    AudioDone,
    #[serde(rename = "output_audio_buffer.stopped")]
    OutputAudioBufferStopped,
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend { audio: String },
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        error: Value,
    },
    /// Any event type the classroom does not act on.
    #[serde(other)]
    Other,
}

impl EventBody {
    pub fn kind(&self) -> &'static str {
        match self {
            EventBody::SessionCreated { .. } => "session.created",
            EventBody::SessionUpdate { .. } => "session.update",
            EventBody::SessionUpdated { .. } => "session.updated",
            EventBody::ResponseCreate { .. } => "response.create",
            EventBody::ResponseCreated { .. } => "response.created",
            EventBody::ResponseDone { .. } => "response.done",
            EventBody::ConversationItemCreate { .. } => "conversation.item.create",
            EventBody::AudioTranscriptDelta { .. } => "response.audio_transcript.delta",
            EventBody::AudioDone => "response.audio.done",
            EventBody::OutputAudioBufferStopped => "output_audio_buffer.stopped",
            EventBody::InputAudioBufferAppend { .. } => "input_audio_buffer.append",
            EventBody::Error { .. } => "error",
            EventBody::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// The `response` object of a `response.done` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseBody {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub output: Vec<ResponseOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseOutput {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Serialized JSON arguments of a function call. Not trusted to parse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    FunctionCall,
    FunctionCallOutput,
    Message,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationItem {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_a_response_done_with_a_function_call() {
        let raw = json!({
            "type": "response.done",
            "event_id": "event_1",
            "response": {
                "id": "resp_1",
                "status": "completed",
                "output": [{
                    "type": "function_call",
                    "object": "realtime.item",
                    "name": "end_conversation",
                    "arguments": "{}",
                    "call_id": "call_9"
                }],
                "usage": {"total_tokens": 12}
            }
        });
        let event: RealtimeEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.event_id.as_deref(), Some("event_1"));
        let EventBody::ResponseDone { response } = event.body else {
            panic!("expected response.done");
        };
        assert_eq!(response.output[0].kind, ItemKind::FunctionCall);
        assert_eq!(response.output[0].call_id.as_deref(), Some("call_9"));
    }

    #[test]
    fn unknown_types_do_not_fail() {
        let event: RealtimeEvent = serde_json::from_str(
            r#"{"type":"rate_limits.updated","event_id":"e","rate_limits":[]}"#,
        )
        .unwrap();
        assert_eq!(event.body, EventBody::Other);
        assert_eq!(event.event_id.as_deref(), Some("e"));
    }

    #[test]
    fn serializes_outbound_events_in_wire_shape() {
        let value = serde_json::to_value(RealtimeEvent::function_call_output(
            "call_1",
            "The user has selected B on the blackboard. ",
        ))
        .unwrap();
        assert_eq!(
            value,
            json!({
                "type": "conversation.item.create",
                "item": {
                    "type": "function_call_output",
                    "call_id": "call_1",
                    "output": "The user has selected B on the blackboard. "
                }
            })
        );

        let bare = serde_json::to_value(RealtimeEvent::response_create()).unwrap();
        assert_eq!(bare, json!({"type": "response.create"}));
    }

    #[test]
    fn unit_events_round_trip() {
        let text = r#"{"type":"output_audio_buffer.stopped","event_id":"x"}"#;
        let event: RealtimeEvent = serde_json::from_str(text).unwrap();
        assert_eq!(event.body, EventBody::OutputAudioBufferStopped);
        let back: Value = serde_json::to_value(&event).unwrap();
        assert_eq!(back["type"], "output_audio_buffer.stopped");
    }
}
