//! Data models and structures
//!
//! Defines the inbound request/response bodies for the HTTP API and the
//! process configuration loaded at startup.

use crate::{Error, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_ANALYZE_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_HANDWRITING_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_HANDWRITING_MIME_TYPE: &str = "image/jpeg";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Body of `POST /api/analyze`.
///
/// The document may arrive under either `data` or `image`; `data` wins when
/// both are present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl AnalysisRequest {
    pub fn binary_data(&self) -> Option<&str> {
        non_empty(&self.data).or_else(|| non_empty(&self.image))
    }

    pub fn mime_type(&self) -> Option<&str> {
        non_empty(&self.mime_type)
    }

    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        non_empty(&self.model).unwrap_or(default)
    }
}

/// Body of `POST /api/generate-handwriting`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandwritingRequest {
    #[serde(default)]
    pub answer_text: Option<String>,
    #[serde(default)]
    pub handwriting_sample: Option<String>,
    #[serde(default)]
    pub handwriting_mime_type: Option<String>,
}

impl HandwritingRequest {
    pub fn answer_text(&self) -> Option<&str> {
        non_empty(&self.answer_text)
    }

    pub fn handwriting_sample(&self) -> Option<&str> {
        non_empty(&self.handwriting_sample)
    }

    pub fn handwriting_mime_type(&self) -> &str {
        non_empty(&self.handwriting_mime_type).unwrap_or(DEFAULT_HANDWRITING_MIME_TYPE)
    }
}

/// Successful `POST /api/generate-handwriting` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HandwritingResponse {
    pub success: bool,
    pub image: String,
    pub mime_type: String,
}

impl HandwritingResponse {
    pub fn png(image_base64: String) -> Self {
        Self {
            success: true,
            image: image_base64,
            mime_type: "image/png".to_string(),
        }
    }
}

/// JSON error body shared by every endpoint and by SSE error frames.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// How `/api/analyze` talks to the upstream model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RelayMode {
    /// One blocking upstream call, wrapped into a single SSE frame.
    #[default]
    Buffered,
    /// Upstream SSE frames are forwarded as they arrive.
    Passthrough,
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub analyze_model: String,
    pub handwriting_model: String,
    pub relay_mode: RelayMode,
    pub upstream_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let relay_mode = match lookup("RELAY_MODE") {
            Some(value) => RelayMode::from_str(&value, true).map_err(|_| {
                Error::Configuration(format!(
                    "Invalid RELAY_MODE '{}'. Expected 'buffered' or 'passthrough'",
                    value
                ))
            })?,
            None => RelayMode::default(),
        };

        let upstream_timeout = match lookup("UPSTREAM_TIMEOUT_SECS") {
            Some(value) => value.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                Error::Configuration(format!("Invalid UPSTREAM_TIMEOUT_SECS '{}'", value))
            })?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            gemini_api_key: lookup("GEMINI_API_KEY").filter(|k| !k.is_empty()),
            gemini_base_url: lookup("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            analyze_model: lookup("ANALYZE_MODEL")
                .unwrap_or_else(|| DEFAULT_ANALYZE_MODEL.to_string()),
            handwriting_model: lookup("HANDWRITING_MODEL")
                .unwrap_or_else(|| DEFAULT_HANDWRITING_MODEL.to_string()),
            relay_mode,
            upstream_timeout,
        })
    }
}
