//! Decoding of `data: <json>` lines into typed events.

use crate::content::AnalysisResult;
use crate::errors::DecodeError;

/// Prefix that marks an event-shaped line.
pub const EVENT_PREFIX: &str = "data: ";

/// A decoded event from the analyze stream.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Progress notification; non-terminal.
    Stage { message: String },
    /// Terminal success.
    Result(Box<AnalysisResult>),
    /// Terminal failure reported by the service.
    Error { detail: String },
}

impl Event {
    /// True for `Result` and `Error`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Stage { .. })
    }
}

/// Decodes one framed line.
///
/// Returns `Ok(None)` for lines that are not event-shaped (blank keepalives,
/// comments, other SSE fields). Event-shaped lines that cannot be decoded are
/// an error rather than being skipped.
pub fn decode_line(line: &str) -> Result<Option<Event>, DecodeError> {
    let Some(body) = line.strip_prefix(EVENT_PREFIX) else {
        return Ok(None);
    };
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| DecodeError::invalid_json(&e))?;
    let serde_json::Value::Object(mut fields) = value else {
        return Err(DecodeError::InvalidJson {
            message: "event body must be a JSON object".into(),
        });
    };
    let event_type = match fields.remove("type") {
        Some(serde_json::Value::String(t)) => t,
        _ => return Err(DecodeError::MissingType),
    };

    match event_type.as_str() {
        "stage" => {
            let message = take_string(&mut fields, "message").ok_or(DecodeError::MissingField {
                event_type: "stage",
                field: "message",
            })?;
            Ok(Some(Event::Stage { message }))
        }
        "result" => {
            let payload: AnalysisResult =
                serde_json::from_value(serde_json::Value::Object(fields))
                    .map_err(|e| DecodeError::invalid_payload(&e))?;
            Ok(Some(Event::Result(Box::new(payload))))
        }
        "error" => {
            // A missing detail still terminates the run; the session supplies a
            // generic message in that case.
            let detail = take_string(&mut fields, "detail").unwrap_or_default();
            Ok(Some(Event::Error { detail }))
        }
        _ => Err(DecodeError::UnknownType { event_type }),
    }
}

fn take_string(
    fields: &mut serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Option<String> {
    match fields.remove(key)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULT_LINE: &str = r#"data: {"type":"result","cover_letter":{"markdown":"Hi","filename":"cl.md"},"cv_suggestions":[],"revised_cv":{"content":"x","format":"markdown","filename":"cv.md"}}"#;

    #[test]
    fn non_event_lines_are_ignored() {
        for line in ["", ": keepalive", "event: message", "data:{\"type\":\"stage\"}", "id: 7"] {
            assert_eq!(decode_line(line), Ok(None), "line {line:?}");
        }
    }

    #[test]
    fn decodes_stage_result_and_error() {
        assert_eq!(
            decode_line(r#"data: {"type":"stage","message":"Parsing CV"}"#),
            Ok(Some(Event::Stage {
                message: "Parsing CV".into()
            }))
        );

        let Ok(Some(Event::Result(result))) = decode_line(RESULT_LINE) else {
            panic!("expected result event");
        };
        assert_eq!(result.cover_letter.filename, "cl.md");
        assert_eq!(result.revised_cv.content, "x");

        assert_eq!(
            decode_line(r#"data: {"type":"error","detail":"bad file"}"#),
            Ok(Some(Event::Error {
                detail: "bad file".into()
            }))
        );
    }

    #[test]
    fn error_without_detail_decodes_with_empty_detail() {
        assert_eq!(
            decode_line(r#"data: {"type":"error"}"#),
            Ok(Some(Event::Error {
                detail: String::new()
            }))
        );
    }

    #[test]
    fn malformed_event_lines_fail() {
        assert!(matches!(
            decode_line("data: {not json"),
            Err(DecodeError::InvalidJson { .. })
        ));
        assert!(matches!(
            decode_line("data: [1,2]"),
            Err(DecodeError::InvalidJson { .. })
        ));
        assert_eq!(
            decode_line(r#"data: {"message":"x"}"#),
            Err(DecodeError::MissingType)
        );
        assert_eq!(
            decode_line(r#"data: {"type":"progress"}"#),
            Err(DecodeError::UnknownType {
                event_type: "progress".into()
            })
        );
        assert_eq!(
            decode_line(r#"data: {"type":"stage"}"#),
            Err(DecodeError::MissingField {
                event_type: "stage",
                field: "message"
            })
        );
        assert!(matches!(
            decode_line(r#"data: {"type":"result","cover_letter":{}}"#),
            Err(DecodeError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn terminal_classification() {
        assert!(!Event::Stage { message: "x".into() }.is_terminal());
        assert!(Event::Error { detail: "x".into() }.is_terminal());
    }
}
