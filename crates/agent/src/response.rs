//! Agent reply shapes and payload extraction
//!
//! The agent answers either with the typed message envelope
//! (`{"info": {...}, "parts": [...]}`) or with some other JSON object. Both
//! are resolved once, at the client boundary, into `AgentResponse`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AgentError;

#[derive(Debug, Clone, Deserialize)]
pub struct MessageEnvelope {
    #[serde(default)]
    pub info: Option<Value>,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Part {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AgentResponse {
    /// Typed message envelope.
    Message(MessageEnvelope),
    /// Any other JSON object.
    Raw(Map<String, Value>),
}

impl AgentResponse {
    pub fn from_value(value: Value) -> Result<Self, AgentError> {
        if let Ok(envelope) = MessageEnvelope::deserialize(&value) {
            return Ok(AgentResponse::Message(envelope));
        }
        match value {
            Value::Object(map) => Ok(AgentResponse::Raw(map)),
            other => Err(AgentError::UnexpectedShape(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Text of every `text` part, in order.
    fn text_parts(&self) -> Vec<&str> {
        match self {
            AgentResponse::Message(envelope) => envelope
                .parts
                .iter()
                .filter(|p| p.kind == "text")
                .filter_map(|p| p.text.as_deref())
                .collect(),
            AgentResponse::Raw(map) => map
                .get("parts")
                .and_then(Value::as_array)
                .map(|parts| {
                    parts
                        .iter()
                        .filter(|p| p.get("type").and_then(Value::as_str) == Some("text"))
                        .filter_map(|p| p.get("text").and_then(Value::as_str))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// What the audit produced: structured JSON when the agent replied with it, text otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuditPayload {
    Text(String),
    Json(Value),
}

/// Payload of the first non-empty text part, or `None` when there is none.
pub fn parse_response(response: &AgentResponse) -> Option<AuditPayload> {
    let text = response.text_parts().into_iter().find(|t| !t.is_empty())?;
    Some(match serde_json::from_str::<Value>(text) {
        Ok(value) => AuditPayload::Json(value),
        Err(_) => AuditPayload::Text(text.to_string()),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
