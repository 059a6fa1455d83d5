/// Failure to turn an event-shaped line (`data: ...`) into an [`Event`](crate::event::Event).
///
/// Lines without the `data: ` prefix never produce this error; they are
/// ignored as transport noise.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The text after `data: ` is not valid JSON.
    #[error("invalid event JSON: {message}")]
    InvalidJson { message: String },
    /// The JSON body is valid but has no string `type` discriminator.
    #[error("event is missing a `type` field")]
    MissingType,
    /// The `type` discriminator names an event this client does not know.
    #[error("unknown event type `{event_type}`")]
    UnknownType { event_type: String },
    /// A known event type is missing a required field.
    #[error("`{event_type}` event is missing field `{field}`")]
    MissingField {
        event_type: &'static str,
        field: &'static str,
    },
    /// The `result` body does not match the expected payload shape.
    #[error("invalid result payload: {message}")]
    InvalidPayload { message: String },
}

impl DecodeError {
    pub(crate) fn invalid_json(err: &serde_json::Error) -> Self {
        Self::InvalidJson {
            message: err.to_string(),
        }
    }

    pub(crate) fn invalid_payload(err: &serde_json::Error) -> Self {
        Self::InvalidPayload {
            message: err.to_string(),
        }
    }
}

/// Top-level error type for the public client API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid request input, rejected before any network I/O.
    #[error("validation error: {0}")]
    Validation(String),
    /// The service answered with a non-success status before streaming began.
    #[error("http error ({status}): {detail}")]
    Http { status: u16, detail: String },
    /// Network or body read failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// The event stream was incomplete or the service reported an error event.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// An event-shaped line could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    /// The caller-imposed deadline elapsed before a terminal event arrived.
    #[error("timed out after {limit:?}")]
    Timeout { limit: std::time::Duration },
    /// The session was aborted through its [`AbortHandle`](crate::session::AbortHandle).
    #[error("cancelled")]
    Cancelled,
}

/// Message used when the byte source ends before any terminal event.
pub const STREAM_ENDED_WITHOUT_RESULT: &str = "stream ended without result";

impl ClientError {
    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Returns the text a caller should show to the user verbatim.
    ///
    /// For service-reported failures this is exactly the producer's detail,
    /// without the classification prefix used by `Display`.
    pub fn detail(&self) -> String {
        match self {
            Self::Config(message)
            | Self::Validation(message)
            | Self::Transport(message)
            | Self::Protocol(message) => message.clone(),
            Self::Http { detail, .. } => detail.clone(),
            Self::Decode(err) => err.to_string(),
            Self::Timeout { .. } | Self::Cancelled => self.to_string(),
        }
    }

    /// True for failures caused by the event stream itself (including decode failures).
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::Decode(_))
    }
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

/// Classifies a non-success initial response into [`ClientError::Http`].
///
/// The detail comes from a JSON body of the form `{"detail": ...}` when
/// present; otherwise the transport status text is used. Structured details
/// (FastAPI-style validation arrays) are kept as compact JSON.
pub fn classify_http_failure(status: u16, status_text: &str, body: &[u8]) -> ClientError {
    let from_body = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .and_then(|detail| match detail {
            serde_json::Value::String(text) => Some(text),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        })
        .filter(|text| !text.trim().is_empty());

    let detail = match from_body {
        Some(detail) => detail,
        None if !status_text.trim().is_empty() => status_text.to_string(),
        None => "Unknown error".to_string(),
    };
    ClientError::Http { status, detail }
}
