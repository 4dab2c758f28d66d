//! Response framing and JSON decoding shared by both backends.
//!
//! # Design
//! `decode` is the single place where response bytes become JSON. It strips
//! the backend's framing, parses, and recognises the backend's in-band error
//! object. Façades then convert the value into a per-operation schema once,
//! through [`schema`], instead of probing fields ad hoc.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::DecodeError;

/// Length of the anti-XSSI prefix the session backend puts before every body.
pub const SESSION_PREFIX_LEN: usize = 5;

/// Framing around a backend's JSON payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    Plain,
    /// Discard exactly this many leading bytes before parsing.
    Prefixed(usize),
}

impl Envelope {
    fn strip<'a>(&self, body: &'a [u8]) -> Result<&'a [u8], DecodeError> {
        match *self {
            Envelope::Plain => Ok(body),
            Envelope::Prefixed(n) => body.get(n..).ok_or(DecodeError::Truncated {
                expected: n,
                actual: body.len(),
            }),
        }
    }
}

/// Keys under which a backend reports a failure inside a JSON body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusFields {
    pub message: String,
    pub code: String,
}

impl StatusFields {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
        }
    }

    /// `status_message` / `status_code`.
    pub fn session_default() -> Self {
        Self::new("status_message", "status_code")
    }

    /// `error` / `code`.
    pub fn record_default() -> Self {
        Self::new("error", "code")
    }

    fn reported(&self, value: &Value) -> Option<DecodeError> {
        let object = value.as_object()?;
        let message = object.get(&self.message)?.as_str()?;
        let code = object.get(&self.code).and_then(Value::as_i64);
        Some(DecodeError::BackendReported {
            message: message.to_string(),
            code,
        })
    }
}

/// Strip `envelope` from `body` and parse the rest as JSON.
///
/// A parsed object carrying `status.message` is reported as
/// [`DecodeError::BackendReported`] whatever the HTTP status was.
pub fn decode(body: &[u8], envelope: Envelope, status: &StatusFields) -> Result<Value, DecodeError> {
    let payload = envelope.strip(body)?;
    let value: Value =
        serde_json::from_slice(payload).map_err(|e| DecodeError::MalformedJson(e.to_string()))?;
    match status.reported(&value) {
        Some(err) => Err(err),
        None => Ok(value),
    }
}

/// Convert a decoded value into an operation's response schema.
pub fn schema<T: DeserializeOwned>(value: Value) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|e| DecodeError::Schema(e.to_string()))
}
