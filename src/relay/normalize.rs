//! The frame envelope the browser front end reads.

use crate::ai::gemini::error::classify_stream_error;
use crate::ai::gemini::types::ErrorStatus;
use crate::models::ErrorBody;
use bytes::Bytes;
use serde::Serialize;

/// `{"candidates":[{"content":{"parts":[{"text":...}]}}]}`
#[derive(Debug, Serialize)]
pub struct NormalizedEvent<'a> {
    candidates: [NormalizedCandidate<'a>; 1],
}

#[derive(Debug, Serialize)]
struct NormalizedCandidate<'a> {
    content: NormalizedContent<'a>,
}

#[derive(Debug, Serialize)]
struct NormalizedContent<'a> {
    parts: [NormalizedPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct NormalizedPart<'a> {
    text: &'a str,
}

impl<'a> NormalizedEvent<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            candidates: [NormalizedCandidate {
                content: NormalizedContent {
                    parts: [NormalizedPart { text }],
                },
            }],
        }
    }
}

fn sse_frame<T: Serialize>(payload: &T) -> Bytes {
    match serde_json::to_string(payload) {
        Ok(json) => Bytes::from(format!("data: {}\n\n", json)),
        // Only reachable with non-string map keys, which these payloads never have.
        Err(_) => Bytes::from_static(b"data: {\"error\":\"serialization failed\"}\n\n"),
    }
}

/// One SSE frame carrying `text` in the normalized envelope.
pub fn normalized_frame(text: &str) -> Bytes {
    sse_frame(&NormalizedEvent::new(text))
}

/// One SSE frame carrying `{"error": message}`.
pub fn error_frame(message: &str) -> Bytes {
    sse_frame(&ErrorBody {
        error: message.to_string(),
    })
}

/// Re-emits a complete upstream frame, terminator included.
///
/// Frames whose data is a JSON object with an `error` member become an
/// [`error_frame`] holding the upstream message; everything else is returned
/// byte-for-byte.
pub fn rewrite_frame(frame: Bytes) -> Bytes {
    match super::sse::frame_data(&frame).and_then(|data| error_message(&data)) {
        Some(message) => error_frame(&message),
        None => frame,
    }
}

fn error_message(data: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(data).ok()?;
    let error = value.get("error")?;

    match error {
        serde_json::Value::String(message) => Some(message.clone()),
        serde_json::Value::Object(_) => {
            let status: ErrorStatus = serde_json::from_value(error.clone()).ok()?;
            let classified = classify_stream_error(&status, data);
            tracing::warn!(
                kind = %classified.kind,
                "Upstream reported an error mid-stream: {}",
                classified.message
            );
            Some(classified.message)
        }
        _ => Some(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalized_frame_shape() {
        let frame = normalized_frame("T");
        assert_eq!(
            frame,
            Bytes::from("data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"T\"}]}}]}\n\n")
        );
    }

    #[test]
    fn test_normalized_frame_escapes_text() {
        let frame = normalized_frame("line 1\n\"quoted\"");
        let json = std::str::from_utf8(&frame)
            .unwrap()
            .strip_prefix("data: ")
            .unwrap()
            .trim_end();
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(
            value["candidates"][0]["content"]["parts"][0]["text"],
            "line 1\n\"quoted\""
        );
    }

    #[test]
    fn test_error_frame_shape() {
        assert_eq!(
            error_frame("boom"),
            Bytes::from("data: {\"error\":\"boom\"}\n\n")
        );
    }

    #[test]
    fn test_rewrite_passes_ordinary_frames_through() {
        let raw = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"a\"}],\"role\":\"model\"}}],\"modelVersion\":\"x\"}\n\n";
        assert_eq!(rewrite_frame(Bytes::from(raw)), Bytes::from(raw));
    }

    #[test]
    fn test_rewrite_keeps_crlf_terminator() {
        let raw = "data: {\"candidates\":[]}\r\n\r\n";
        assert_eq!(rewrite_frame(Bytes::from(raw)), Bytes::from(raw));
    }

    #[test]
    fn test_rewrite_reshapes_upstream_error_object() {
        let raw = "data: {\"error\":{\"code\":503,\"message\":\"The model is overloaded.\",\"status\":\"UNAVAILABLE\"}}\r\n\r\n";
        assert_eq!(
            rewrite_frame(Bytes::from(raw)),
            error_frame("The model is overloaded.")
        );
    }

    #[test]
    fn test_rewrite_keeps_non_json_frames() {
        let raw = ": ping\n\n";
        assert_eq!(rewrite_frame(Bytes::from(raw)), Bytes::from(raw));
    }
}
