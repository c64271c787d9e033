//! Classification of Gemini failures into [`UpstreamErrorKind`].
//!
//! Gemini reports quota exhaustion both as HTTP 429 and as a
//! `RESOURCE_EXHAUSTED` status inside the error envelope. The retry delay is
//! read from the structured `RetryInfo` detail when present. Bodies that are
//! not a well-formed envelope fall back to substring and regex matching on the
//! raw text, which breaks silently if Gemini rewords its messages.

use super::types::{ErrorEnvelope, ErrorStatus};
use crate::error::{UpstreamError, UpstreamErrorKind};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

const RETRY_INFO_TYPE: &str = "type.googleapis.com/google.rpc.RetryInfo";

static RETRY_IN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)retry in ([\d.]+)s").expect("retry pattern is valid"));

/// Builds an [`UpstreamError`] from a non-2xx status and its response body.
pub fn classify(status: u16, body: &str) -> UpstreamError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => from_status(&envelope.error, Some(status), body),
        Err(_) => UpstreamError::new(kind_from_raw(Some(status), body), body.trim())
            .with_status(status)
            .with_retry_after(retry_after_from_text(body)),
    }
}

/// Classifies an error object embedded in an SSE frame.
pub fn classify_stream_error(error: &ErrorStatus, raw: &str) -> UpstreamError {
    from_status(error, error.code, raw)
}

fn from_status(error: &ErrorStatus, status: Option<u16>, raw: &str) -> UpstreamError {
    let kind = error
        .status
        .as_deref()
        .and_then(kind_from_status_name)
        .unwrap_or_else(|| kind_from_raw(status, raw));

    let retry_after = retry_after_from_details(&error.details)
        .or_else(|| retry_after_from_text(&error.message))
        .or_else(|| retry_after_from_text(raw));

    let message = if error.message.is_empty() {
        raw.trim().to_string()
    } else {
        error.message.clone()
    };

    let err = UpstreamError::new(kind, message).with_retry_after(retry_after);
    match status {
        Some(code) => err.with_status(code),
        None => err,
    }
}

fn kind_from_status_name(name: &str) -> Option<UpstreamErrorKind> {
    match name {
        "RESOURCE_EXHAUSTED" => Some(UpstreamErrorKind::Quota),
        "UNAUTHENTICATED" | "PERMISSION_DENIED" => Some(UpstreamErrorKind::Auth),
        "INVALID_ARGUMENT" | "FAILED_PRECONDITION" | "NOT_FOUND" | "OUT_OF_RANGE" => {
            Some(UpstreamErrorKind::MalformedRequest)
        }
        "UNAVAILABLE" | "INTERNAL" | "DEADLINE_EXCEEDED" | "ABORTED" => {
            Some(UpstreamErrorKind::Transient)
        }
        _ => None,
    }
}

fn kind_from_code(code: u16) -> UpstreamErrorKind {
    match code {
        429 => UpstreamErrorKind::Quota,
        401 | 403 => UpstreamErrorKind::Auth,
        400 | 404 | 413 | 422 => UpstreamErrorKind::MalformedRequest,
        408 | 500 | 502 | 503 | 504 => UpstreamErrorKind::Transient,
        _ => UpstreamErrorKind::Unknown,
    }
}

fn kind_from_raw(status: Option<u16>, body: &str) -> UpstreamErrorKind {
    if body.contains("RESOURCE_EXHAUSTED") {
        UpstreamErrorKind::Quota
    } else {
        status.map(kind_from_code).unwrap_or(UpstreamErrorKind::Unknown)
    }
}

fn retry_after_from_details(details: &[serde_json::Value]) -> Option<Duration> {
    details
        .iter()
        .filter(|d| d.get("@type").and_then(|t| t.as_str()) == Some(RETRY_INFO_TYPE))
        .find_map(|d| d.get("retryDelay").and_then(|v| v.as_str()))
        .and_then(parse_seconds)
}

fn retry_after_from_text(text: &str) -> Option<Duration> {
    let captures = RETRY_IN.captures(text)?;
    parse_seconds(captures.get(1)?.as_str())
}

fn parse_seconds(value: &str) -> Option<Duration> {
    let seconds: f64 = value.trim().trim_end_matches('s').parse().ok()?;
    if seconds.is_finite() && seconds >= 0.0 {
        Some(Duration::from_secs_f64(seconds))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quota_envelope_uses_retry_info() {
        let body = serde_json::json!({
            "error": {
                "code": 429,
                "message": "You exceeded your current quota. Please retry in 41.2s.",
                "status": "RESOURCE_EXHAUSTED",
                "details": [
                    {"@type": "type.googleapis.com/google.rpc.QuotaFailure"},
                    {"@type": "type.googleapis.com/google.rpc.RetryInfo", "retryDelay": "41s"}
                ]
            }
        })
        .to_string();

        let err = classify(429, &body);
        assert_eq!(err.kind, UpstreamErrorKind::Quota);
        assert_eq!(err.status, Some(429));
        assert_eq!(err.retry_after, Some(Duration::from_secs(41)));
        assert!(err.message.starts_with("You exceeded"));
    }

    #[test]
    fn test_quota_from_message_when_no_retry_info() {
        let body = r#"{"error":{"code":429,"message":"Please retry in 12.5s","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = classify(429, body);
        assert_eq!(err.retry_after, Some(Duration::from_secs_f64(12.5)));
    }

    #[test]
    fn test_raw_body_resource_exhausted() {
        let err = classify(500, "upstream said RESOURCE_EXHAUSTED. Please retry in 12.5s");
        assert_eq!(err.kind, UpstreamErrorKind::Quota);
        assert_eq!(err.retry_after, Some(Duration::from_secs_f64(12.5)));
    }

    #[test]
    fn test_auth_status() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"UNAUTHENTICATED"}}"#;
        assert_eq!(classify(400, body).kind, UpstreamErrorKind::Auth);
    }

    #[test]
    fn test_invalid_argument_is_malformed_request() {
        let body = r#"{"error":{"code":400,"message":"Unsupported MIME type","status":"INVALID_ARGUMENT"}}"#;
        let err = classify(400, body);
        assert_eq!(err.kind, UpstreamErrorKind::MalformedRequest);
        assert_eq!(err.message, "Unsupported MIME type");
    }

    #[test]
    fn test_unknown_status_name_falls_back_to_code() {
        let body = r#"{"error":{"code":503,"message":"overloaded","status":"SOMETHING_NEW"}}"#;
        assert_eq!(classify(503, body).kind, UpstreamErrorKind::Transient);
    }

    #[test]
    fn test_envelope_mentioning_resource_exhausted_is_quota() {
        let body = r#"{"error":{"code":500,"message":"Backend returned RESOURCE_EXHAUSTED, retry in 3s","status":"SOMETHING_NEW"}}"#;
        let err = classify(500, body);
        assert_eq!(err.kind, UpstreamErrorKind::Quota);
        assert_eq!(err.retry_after, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_known_status_name_wins_over_raw_text() {
        let body = r#"{"error":{"code":400,"message":"RESOURCE_EXHAUSTED is not a valid field","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(classify(400, body).kind, UpstreamErrorKind::MalformedRequest);
    }

    #[test]
    fn test_retry_hint_case_insensitive() {
        assert_eq!(
            retry_after_from_text("Quota hit. RETRY IN 7s"),
            Some(Duration::from_secs(7))
        );
    }

    #[test]
    fn test_plain_text_body() {
        let err = classify(418, "  teapot  ");
        assert_eq!(err.kind, UpstreamErrorKind::Unknown);
        assert_eq!(err.message, "teapot");
        assert_eq!(err.retry_after, None);
    }

    #[test]
    fn test_stream_error_without_code() {
        let status: ErrorStatus = serde_json::from_str(
            r#"{"message":"The model is overloaded.","status":"UNAVAILABLE"}"#,
        )
        .unwrap();
        let err = classify_stream_error(&status, "");
        assert_eq!(err.kind, UpstreamErrorKind::Transient);
        assert_eq!(err.status, None);
    }
}
