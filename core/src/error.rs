//! Error taxonomy for the client layer.
//!
//! # Design
//! Errors are layered the same way the client is: `TransportError` for the
//! network round trip, `DecodeError` for framing, JSON and backend-reported
//! failures, and `ApiError` for what a façade hands back to its caller.
//! Lower-layer errors pass through `ApiError` unchanged via `#[from]`; the
//! only translation is sign-in, where a backend-reported failure becomes
//! `InvalidCredentials`.
//!
//! Every error is terminal for the call that produced it.

/// Code reported when a backend message carries no status code of its own.
pub const UNSPECIFIED_CODE: i64 = 1;

/// Network-level failure of a single round trip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// DNS, connection, TLS or timeout failure.
    #[error("request failed: {0}")]
    Request(String),

    /// The request could not be constructed (bad URL or header).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Failure to turn a response body into a usable JSON value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The body is shorter than the backend's fixed prefix.
    #[error("response body has {actual} bytes, shorter than the {expected}-byte prefix")]
    Truncated { expected: usize, actual: usize },

    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    /// Valid JSON carrying the backend's status-message field.
    #[error("{message}")]
    BackendReported { message: String, code: Option<i64> },

    /// A field was present but had the wrong shape for the operation.
    #[error("unexpected response shape: {0}")]
    Schema(String),
}

impl DecodeError {
    /// The backend code, or [`UNSPECIFIED_CODE`] when none was sent.
    pub fn code_or_unspecified(&self) -> Option<i64> {
        match self {
            DecodeError::BackendReported { code, .. } => Some(code.unwrap_or(UNSPECIFIED_CODE)),
            _ => None,
        }
    }
}

/// Errors returned by the session and record façades.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The session backend refused the username/password pair.
    #[error("sign in failed: {message}")]
    InvalidCredentials { message: String, code: Option<i64> },

    /// A successful response lacked a field the operation needs.
    #[error("response is missing `{0}`")]
    FieldMissing(&'static str),

    /// A location draft lacked a field required for submission.
    #[error("location is missing `{0}`")]
    IncompleteRecord(&'static str),

    #[error("request body could not be serialized: {0}")]
    Serialization(String),
}

impl ApiError {
    /// Numeric code for presentation, when the backend supplied one (or
    /// [`UNSPECIFIED_CODE`] for a backend message without a code).
    pub fn status_code(&self) -> Option<i64> {
        match self {
            ApiError::InvalidCredentials { code, .. } => Some(code.unwrap_or(UNSPECIFIED_CODE)),
            ApiError::Decode(err) => err.code_or_unspecified(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_message_is_displayed_verbatim() {
        let err = ApiError::from(DecodeError::BackendReported {
            message: "quota exceeded".to_string(),
            code: Some(155),
        });
        assert_eq!(err.to_string(), "quota exceeded");
        assert_eq!(err.status_code(), Some(155));
    }

    #[test]
    fn missing_code_reports_unspecified() {
        let err = ApiError::InvalidCredentials {
            message: "nope".to_string(),
            code: None,
        };
        assert_eq!(err.status_code(), Some(UNSPECIFIED_CODE));
        assert_eq!(err.to_string(), "sign in failed: nope");
    }

    #[test]
    fn structural_errors_have_no_code() {
        assert_eq!(ApiError::FieldMissing("results").status_code(), None);
        let err = ApiError::from(TransportError::Request("connection refused".to_string()));
        assert_eq!(err.status_code(), None);
        assert_eq!(err.to_string(), "request failed: connection refused");
    }
}
