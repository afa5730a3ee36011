use crate::sse::SseFrame;
use crate::types::{ContentType, Event};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

// --- WIRE TYPES ---

#[derive(Deserialize, Debug)]
struct WireEnvelope {
    message: WireMessage,
    #[serde(default)]
    session_uuid: Option<String>,
}

/// Older servers wrap the same envelope as `{"result": {...}}`.
#[derive(Deserialize, Debug)]
struct WireResultEnvelope {
    result: WireEnvelope,
    #[serde(default)]
    session_uuid: Option<String>,
}

#[derive(Deserialize, Debug)]
struct WireMessage {
    #[serde(default, deserialize_with = "null_as_default")]
    content: WireContent,
    #[serde(default, deserialize_with = "null_as_default")]
    metadata: WireMetadata,
    #[serde(default, deserialize_with = "null_as_default")]
    end_turn: bool,
}

#[derive(Deserialize, Debug, Default)]
struct WireContent {
    #[serde(default, deserialize_with = "null_as_default")]
    content_type: ContentType,
    #[serde(default, deserialize_with = "deserialize_parts")]
    parts: Vec<String>,
}

/// `null` reads as the zero value, the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A `null` parts list is empty; a `null` entry is an empty part.
fn deserialize_parts<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let parts = Option::<Vec<Option<String>>>::deserialize(deserializer)?;
    Ok(parts
        .unwrap_or_default()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect())
}

#[derive(Deserialize, Debug, Default)]
struct WireMetadata {
    #[serde(default, deserialize_with = "deserialize_is_delta")]
    is_delta: Option<bool>,
}

/// `is_delta` shows up as a bool, as a `"true"`/`"false"` string, or not at
/// all. Anything else reads as absent.
pub fn coerce_is_delta(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn deserialize_is_delta<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_is_delta(&value))
}

impl WireEnvelope {
    fn into_event(self, event_type: &str, outer_session: Option<String>) -> Event {
        Event {
            event_type: event_type.to_string(),
            content_type: self.message.content.content_type,
            parts: self.message.content.parts,
            is_delta: self.message.metadata.is_delta,
            end_turn: self.message.end_turn,
            session_uuid: self.session_uuid.or(outer_session),
        }
    }
}

/// Decode one payload. `None` means both envelope shapes failed and the
/// payload is dropped; that is never fatal.
pub fn decode_payload(event_type: &str, data: &str) -> Option<Event> {
    let primary_err = match serde_json::from_str::<WireEnvelope>(data) {
        Ok(envelope) => return Some(envelope.into_event(event_type, None)),
        Err(e) => e,
    };

    match serde_json::from_str::<WireResultEnvelope>(data) {
        Ok(wrapped) => {
            tracing::trace!("[ENVELOPE] recovered payload via result envelope");
            Some(wrapped.result.into_event(event_type, wrapped.session_uuid))
        }
        Err(fallback_err) => {
            tracing::debug!(
                "[ENVELOPE] dropping payload (event: {}): primary: {}; fallback: {}; data: {}",
                event_type,
                primary_err,
                fallback_err,
                crate::str_utils::prefix_chars(data, 200)
            );
            None
        }
    }
}

pub fn decode_frame(frame: &SseFrame) -> Option<Event> {
    decode_payload(&frame.event_type, &frame.data)
}

/// String-ish field of a JSON object embedded in a part. Numbers are
/// stringified, anything else reads as empty.
pub fn string_field(obj: &serde_json::Map<String, Value>, name: &str) -> String {
    match obj.get(name) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn is_delta_coercion_table() {
        assert_eq!(coerce_is_delta(&json!(true)), Some(true));
        assert_eq!(coerce_is_delta(&json!(false)), Some(false));
        assert_eq!(coerce_is_delta(&json!("true")), Some(true));
        assert_eq!(coerce_is_delta(&json!("false")), Some(false));
        assert_eq!(coerce_is_delta(&json!(null)), None);
        assert_eq!(coerce_is_delta(&json!(1)), None);
        assert_eq!(coerce_is_delta(&json!("yes")), None);
    }

    #[test]
    fn decodes_primary_envelope() {
        let data = r#"{"message":{"content":{"content_type":"CONTENT_TYPE_CHAT_RESPONSE","parts":["Hello"]},"metadata":{"is_delta":"true"},"end_turn":true},"session_uuid":"abc"}"#;
        let event = decode_payload("message", data).unwrap();
        assert_eq!(event.event_type, "message");
        assert_eq!(event.content_type, ContentType::ChatResponse);
        assert_eq!(event.parts, vec!["Hello".to_string()]);
        assert!(event.is_delta());
        assert!(event.end_turn);
        assert_eq!(event.session_uuid.as_deref(), Some("abc"));
    }

    #[test]
    fn absent_and_numeric_is_delta_read_as_false() {
        let absent = r#"{"message":{"content":{"content_type":"CHAT_RESPONSE","parts":["x"]}}}"#;
        let numeric = r#"{"message":{"content":{"content_type":"CHAT_RESPONSE","parts":["x"]},"metadata":{"is_delta":1}}}"#;
        assert!(!decode_payload("message", absent).unwrap().is_delta());
        assert!(!decode_payload("message", numeric).unwrap().is_delta());
    }

    #[test]
    fn null_fields_read_as_zero_values() {
        let data = r#"{"message":{"content":{"content_type":"CHAT_RESPONSE","parts":["Hello",null]},"metadata":null,"end_turn":true}}"#;
        let event = decode_payload("message", data).unwrap();
        assert_eq!(event.parts, vec!["Hello".to_string(), String::new()]);
        assert!(!event.is_delta());
        assert!(event.end_turn);

        let bare = r#"{"message":{"content":{"content_type":null,"parts":null},"end_turn":null}}"#;
        let event = decode_payload("message", bare).unwrap();
        assert_eq!(event.content_type, ContentType::Unspecified);
        assert!(event.parts.is_empty());
        assert!(!event.end_turn);

        let empty = r#"{"message":{"content":null,"metadata":{"is_delta":null}}}"#;
        assert!(decode_payload("message", empty).is_some());
    }

    #[test]
    fn falls_back_to_result_envelope_and_keeps_event_type() {
        let data = r#"{"result":{"message":{"content":{"content_type":"CHAIN_OF_THOUGHT","parts":["{}"]}}},"session_uuid":"s-1"}"#;
        let event = decode_payload("cot_delta", data).unwrap();
        assert_eq!(event.event_type, "cot_delta");
        assert_eq!(event.content_type, ContentType::ChainOfThought);
        assert_eq!(event.session_uuid.as_deref(), Some("s-1"));
    }

    #[test]
    fn type_mismatch_in_both_shapes_is_dropped() {
        let data = r#"{"message":{"content":{"content_type":42,"parts":["x"]}}}"#;
        assert!(decode_payload("message", data).is_none());
        assert!(decode_payload("message", "not json").is_none());
    }
}
