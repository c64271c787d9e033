//! Error handling and custom error types
//!
//! Provides unified error handling across the relay using thiserror. Upstream
//! failures are classified once, where the HTTP exchange happens, so handlers
//! branch on [`UpstreamErrorKind`] instead of inspecting message text.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Upstream(UpstreamError),

    #[error("{0}")]
    UnexpectedOutput(String),

    #[error("{0}")]
    GenerationFailed(String),

    #[error("{}", quota_message(.retry_after))]
    QuotaExceeded { retry_after: Option<Duration> },

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<UpstreamError> for Error {
    fn from(err: UpstreamError) -> Self {
        Error::Upstream(err)
    }
}

/// Closed set of upstream failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    Quota,
    Auth,
    MalformedRequest,
    Transient,
    Unknown,
}

impl fmt::Display for UpstreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpstreamErrorKind::Quota => "quota",
            UpstreamErrorKind::Auth => "auth",
            UpstreamErrorKind::MalformedRequest => "malformed_request",
            UpstreamErrorKind::Transient => "transient",
            UpstreamErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A failed call to the generative API.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamError {
    pub kind: UpstreamErrorKind,
    /// HTTP status, absent for transport failures.
    pub status: Option<u16>,
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl UpstreamError {
    pub fn new(kind: UpstreamErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    pub fn transport(err: reqwest::Error) -> Self {
        Self::new(UpstreamErrorKind::Transient, err.to_string())
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "Gemini API error (status {}): {}", status, self.message),
            None => write!(f, "Gemini API error: {}", self.message),
        }
    }
}

impl std::error::Error for UpstreamError {}

const QUOTA_EXPLANATION: &str = "⚠️ Quota Exceeded: The free tier for image generation models has been exhausted. \
Image generation models have very limited quota on the free tier.\n\n\
Options:\n\
1. Wait and try again later (quota resets daily)\n\
2. Upgrade your Google AI Studio plan for higher quotas\n\
3. Check your usage at: https://ai.dev/usage?tab=rate-limit\n\n\
For more information: https://ai.google.dev/gemini-api/docs/rate-limits";

fn quota_message(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(delay) => format!(
            "{}\n\nPlease retry in approximately {}",
            QUOTA_EXPLANATION,
            format_retry_hint(*delay)
        ),
        None => QUOTA_EXPLANATION.to_string(),
    }
}

/// Formats a delay as `{minutes}m {seconds}s`, truncating fractional seconds.
pub fn format_retry_hint(delay: Duration) -> String {
    let total = delay.as_secs();
    format!("{}m {}s", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_hint_truncates_fraction() {
        assert_eq!(format_retry_hint(Duration::from_secs_f64(12.5)), "0m 12s");
    }

    #[test]
    fn test_retry_hint_minutes() {
        assert_eq!(format_retry_hint(Duration::from_secs(135)), "2m 15s");
    }

    #[test]
    fn test_quota_message_with_delay() {
        let err = Error::QuotaExceeded {
            retry_after: Some(Duration::from_secs_f64(12.5)),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("⚠️ Quota Exceeded"));
        assert!(msg.ends_with("Please retry in approximately 0m 12s"));
    }

    #[test]
    fn test_quota_message_without_delay() {
        let msg = Error::QuotaExceeded { retry_after: None }.to_string();
        assert!(msg.contains("rate-limits"));
        assert!(!msg.contains("Please retry in"));
    }

    #[test]
    fn test_upstream_display_includes_status() {
        let err = UpstreamError::new(UpstreamErrorKind::Auth, "API key not valid").with_status(400);
        assert_eq!(
            Error::from(err).to_string(),
            "Gemini API error (status 400): API key not valid"
        );
    }
}
