//! Outgoing message payloads.
//!
//! A [`Message`] is either text or binary. Values coming from a script
//! engine arrive as [`serde_json::Value`] and are converted with
//! [`TryFrom`]; anything that is not a string or a byte array is rejected
//! with [`Error::UnsupportedPayload`].

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// Message
// ============================================================================

/// A payload the host can send over the outgoing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
}

impl Message {
    /// Creates a text message.
    #[inline]
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text(body.into())
    }

    /// Creates a binary message.
    #[inline]
    #[must_use]
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Binary(bytes.into())
    }

    /// Returns the payload length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(body) => body.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    /// Returns `true` if the payload is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `"Text"` or `"Binary"`.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "Text",
            Self::Binary(_) => "Binary",
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<String> for Message {
    fn from(body: String) -> Self {
        Self::Text(body)
    }
}

impl From<&str> for Message {
    fn from(body: &str) -> Self {
        Self::Text(body.to_owned())
    }
}

impl From<Vec<u8>> for Message {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

impl From<&[u8]> for Message {
    fn from(bytes: &[u8]) -> Self {
        Self::Binary(bytes.to_vec())
    }
}

impl TryFrom<Value> for Message {
    type Error = Error;

    /// Strings become text; arrays of integers in `0..=255` become binary.
    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(body) => Ok(Self::Text(body)),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
                .collect::<Option<Vec<u8>>>()
                .map(Self::Binary)
                .ok_or_else(|| Error::unsupported_payload("non-byte array")),
            other => Err(Error::unsupported_payload(value_kind(&other))),
        }
    }
}

/// Names a JSON value's type the way a script engine would.
fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Tests
// ============================================================================
