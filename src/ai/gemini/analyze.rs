use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentRequest, GenerateContentResponse, InlineData, Part};
use crate::ai::{AnalysisService, ByteStream, InlineDocument};
use crate::{prompts, Error, Result};
use async_trait::async_trait;

pub struct GeminiAnalysisClient {
    http: GeminiHttpClient,
}

impl GeminiAnalysisClient {
    pub fn new(http: GeminiHttpClient) -> Self {
        Self { http }
    }

    /// The document followed by the fixed solving instructions.
    fn build_request(document: &InlineDocument) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: document.mime_type.clone(),
                            data: document.data.clone(),
                        },
                    },
                    Part::Text {
                        text: prompts::ANALYZE.to_string(),
                    },
                ],
            }],
            generation_config: None,
        }
    }

    fn extract_text(response: &GenerateContentResponse) -> Option<String> {
        let texts: Vec<&str> = response
            .first_parts()
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();

        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }
}

#[async_trait]
impl AnalysisService for GeminiAnalysisClient {
    async fn analyze(&self, document: &InlineDocument, model: &str) -> Result<String> {
        tracing::debug!(
            "Analyzing {} document ({} base64 chars) with {}",
            document.mime_type,
            document.data.len(),
            model
        );

        let request = Self::build_request(document);
        let response: GenerateContentResponse = self.http.generate_content(model, &request).await?;

        Self::extract_text(&response)
            .ok_or_else(|| Error::UnexpectedOutput("No text in Gemini analysis response".to_string()))
    }

    async fn analyze_stream(&self, document: &InlineDocument, model: &str) -> Result<ByteStream> {
        tracing::debug!(
            "Opening analysis stream for {} document with {}",
            document.mime_type,
            model
        );

        let request = Self::build_request(document);
        self.http.stream_generate_content(model, &request).await
    }
}
