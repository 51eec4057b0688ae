//! Canonical text form of configuration values.
//!
//! Stored values are JSON text. Values arrive either as already structured JSON
//! or as raw text that may itself encode JSON or a Python-style literal; the
//! distinction is made once, at ingress, through [`ConfigValue`].

pub mod literal;

use serde_json::Value;
use tracing::debug;

pub use literal::{parse_literal, LiteralError};

#[derive(Clone, Debug, PartialEq)]
pub enum ConfigValue {
    /// Text that may encode JSON or a literal expression.
    Raw(String),
    /// A native container or primitive.
    Structured(Value),
}

impl ConfigValue {
    /// Classifies a field of an inbound JSON document. JSON strings keep their
    /// text so that encoded payloads (`"['a']"`) get the layered parse; `null`
    /// means "no value".
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(text) => Some(Self::Raw(text)),
            other => Some(Self::Structured(other)),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::Raw(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::Raw(value)
    }
}

impl From<Value> for ConfigValue {
    fn from(value: Value) -> Self {
        Self::Structured(value)
    }
}

/// Normalizes a value into the JSON text persisted for it. `None` means the
/// column is stored as NULL.
pub fn to_canonical_text(value: Option<&ConfigValue>) -> Option<String> {
    match value? {
        ConfigValue::Structured(Value::Null) => None,
        ConfigValue::Structured(structured) => Some(encode(structured)),
        ConfigValue::Raw(text) if text.is_empty() => Some(encode_str(text)),
        ConfigValue::Raw(text) => {
            if serde_json::from_str::<Value>(text).is_ok() {
                return Some(text.clone());
            }
            match parse_literal(text) {
                Ok(parsed) => {
                    debug!(
                        event_name = "config.value.literal_reencoded",
                        raw_len = text.len(),
                        "value was a literal expression, re-encoded as json"
                    );
                    Some(encode(&parsed))
                }
                Err(error) => {
                    debug!(
                        event_name = "config.value.string_fallback",
                        reason = %error,
                        "value stored as a json string literal"
                    );
                    Some(encode_str(text))
                }
            }
        }
    }
}

/// Reconstitutes a stored value for transport. JSON `null` reads back as `None`.
pub fn from_canonical_text(value: Option<&ConfigValue>) -> Option<Value> {
    let decoded = match value? {
        ConfigValue::Structured(structured) => structured.clone(),
        ConfigValue::Raw(text) => decode_text(text),
    };
    (!decoded.is_null()).then_some(decoded)
}

/// JSON first, then literal, then the text itself as a string.
pub fn decode_text(text: &str) -> Value {
    if let Ok(parsed) = serde_json::from_str::<Value>(text) {
        return parsed;
    }
    parse_literal(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// JSON first, then literal, with no string fallback. Used where the caller
/// needs a container and substitutes its own empty default on failure.
pub fn decode_structured(value: &ConfigValue) -> Option<Value> {
    match value {
        ConfigValue::Structured(structured) => Some(structured.clone()),
        ConfigValue::Raw(text) => {
            serde_json::from_str::<Value>(text).ok().or_else(|| parse_literal(text).ok())
        }
    }
}

pub(crate) fn encode(value: &Value) -> String {
    match serde_json::to_string(value) {
        Ok(text) => text,
        Err(error) => {
            debug!(
                event_name = "config.value.encode_failed",
                reason = %error,
                "falling back to the string form of the value"
            );
            encode_str(&format!("{value:?}"))
        }
    }
}

fn encode_str(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}
