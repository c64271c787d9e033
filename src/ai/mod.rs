//! Generative AI integration for document analysis and handwriting synthesis
//!
//! Provides interfaces to Gemini's `generateContent` APIs. Each capability is a
//! trait so handlers can be exercised against scripted fakes.

pub mod gemini;
pub mod mock;

pub use gemini::{GeminiAnalysisClient, GeminiHandwritingClient, GeminiHttpClient};
pub use mock::{MockAnalysisClient, MockHandwritingClient};

use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

/// Raw upstream bytes, chunked however the transport delivered them.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// A document or image sent inline to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineDocument {
    pub mime_type: String,
    /// Base64 payload, forwarded without re-encoding.
    pub data: String,
}

/// One model output part, in the order the model produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputPart {
    Text(String),
    Image { mime_type: String, data: Vec<u8> },
}

#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Runs one blocking analysis call and returns the concatenated answer text.
    async fn analyze(&self, document: &InlineDocument, model: &str) -> Result<String>;

    /// Opens a streaming analysis call and returns the upstream SSE body.
    async fn analyze_stream(&self, document: &InlineDocument, model: &str) -> Result<ByteStream>;
}

#[async_trait]
pub trait HandwritingService: Send + Sync {
    async fn synthesize(&self, sample: &[u8], mime_type: &str, prompt: &str)
        -> Result<Vec<OutputPart>>;
}
