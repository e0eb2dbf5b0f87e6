use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Argument rejected before any request is sent.
///
/// Every variant carries the offending field so the message reads on its own
/// when it ends up in a tool result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing required field '{field}'")]
    Missing { field: String },

    #[error("'{field}' must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("'{field}' must not be empty")]
    Empty { field: String },

    #[error("'{field}' must be at most {max} characters (got {actual})")]
    TooLong {
        field: String,
        max: usize,
        actual: usize,
    },

    #[error("'{field}' must be between {min} and {max} (got {actual})")]
    OutOfRange {
        field: String,
        min: f64,
        max: f64,
        actual: f64,
    },
}

impl ValidationError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Missing {
            field: field.into(),
        }
    }

    pub fn wrong_type(field: impl Into<String>, expected: &'static str) -> Self {
        Self::WrongType {
            field: field.into(),
            expected,
        }
    }

    pub fn empty(field: impl Into<String>) -> Self {
        Self::Empty {
            field: field.into(),
        }
    }

    /// Name of the argument that failed.
    pub fn field(&self) -> &str {
        match self {
            Self::Missing { field }
            | Self::WrongType { field, .. }
            | Self::Empty { field }
            | Self::TooLong { field, .. }
            | Self::OutOfRange { field, .. } => field,
        }
    }
}

/// Error body returned by the Carapace API on non-2xx responses.
///
/// Shape: `{"error": {"code": "...", "message": "...", "retryAfter": 30}}`.
/// Only `message` is surfaced to callers; the client logs `code` and
/// `retryAfter`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteErrorBody {
    pub error: Option<RemoteError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "retryAfter")]
    pub retry_after: Option<Value>,
}

impl RemoteErrorBody {
    /// Parse an error response body. Returns `None` when the body is not JSON
    /// or does not match the documented shape.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }

    /// The remote-supplied message, if present and non-empty.
    pub fn message(&self) -> Option<&str> {
        self.error
            .as_ref()
            .and_then(|err| err.message.as_deref())
            .filter(|message| !message.is_empty())
    }
}

/// Message for a failed response: the remote `error.message` when the body
/// carries one, otherwise `API error: <status>`.
pub fn describe_failure(status: u16, body: &[u8]) -> String {
    RemoteErrorBody::parse(body)
        .as_ref()
        .and_then(RemoteErrorBody::message)
        .map(str::to_string)
        .unwrap_or_else(|| format!("API error: {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_body_yields_remote_message() {
        let body =
            br#"{"error":{"code":"RATE_LIMITED","message":"Rate limit exceeded","retryAfter":30}}"#;
        assert_eq!(describe_failure(429, body), "Rate limit exceeded");

        let parsed = RemoteErrorBody::parse(body).unwrap();
        let err = parsed.error.unwrap();
        assert_eq!(err.code.as_deref(), Some("RATE_LIMITED"));
        assert_eq!(err.retry_after, Some(serde_json::json!(30)));
    }

    #[test]
    fn non_json_body_falls_back_to_status() {
        assert_eq!(describe_failure(502, b"<html>Bad Gateway</html>"), "API error: 502");
        assert_eq!(describe_failure(500, b""), "API error: 500");
    }

    #[test]
    fn json_without_usable_message_falls_back_to_status() {
        assert_eq!(describe_failure(404, br#"{}"#), "API error: 404");
        assert_eq!(describe_failure(400, br#"{"error":"bad"}"#), "API error: 400");
        assert_eq!(describe_failure(400, br#"{"error":{"message":""}}"#), "API error: 400");
        assert_eq!(describe_failure(400, br#"{"error":{"message":42}}"#), "API error: 400");
        assert_eq!(describe_failure(503, br#"[1,2,3]"#), "API error: 503");
    }

    #[test]
    fn validation_messages_name_the_field() {
        let err = ValidationError::TooLong {
            field: "claim".to_string(),
            max: 2000,
            actual: 2001,
        };
        assert_eq!(err.field(), "claim");
        assert_eq!(
            err.to_string(),
            "'claim' must be at most 2000 characters (got 2001)"
        );

        let err = ValidationError::OutOfRange {
            field: "confidence".to_string(),
            min: 0.0,
            max: 1.0,
            actual: 1.5,
        };
        assert_eq!(err.to_string(), "'confidence' must be between 0 and 1 (got 1.5)");
        assert_eq!(
            ValidationError::missing("question").to_string(),
            "Missing required field 'question'"
        );
    }
}
