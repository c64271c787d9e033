use super::client::GeminiHttpClient;
use super::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, InlineData, Part,
};
use crate::ai::{HandwritingService, OutputPart};
use crate::{Error, Result};
use async_trait::async_trait;
use base64::Engine as _;

pub struct GeminiHandwritingClient {
    http: GeminiHttpClient,
    model: String,
}

impl GeminiHandwritingClient {
    pub fn new(http: GeminiHttpClient, model: String) -> Self {
        Self { http, model }
    }

    fn to_output_parts(response: GenerateContentResponse) -> Result<Vec<OutputPart>> {
        let parts = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();

        let mut output = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Part::Text { text } => output.push(OutputPart::Text(text)),
                Part::InlineData { inline_data } => {
                    let data = base64::engine::general_purpose::STANDARD
                        .decode(&inline_data.data)
                        .map_err(|e| {
                            Error::UnexpectedOutput(format!(
                                "Failed to decode Gemini base64 image: {}",
                                e
                            ))
                        })?;
                    output.push(OutputPart::Image {
                        mime_type: inline_data.mime_type,
                        data,
                    });
                }
                Part::Other(value) => {
                    tracing::debug!("Skipping unrecognized Gemini part: {}", value);
                }
            }
        }
        Ok(output)
    }
}

#[async_trait]
impl HandwritingService for GeminiHandwritingClient {
    async fn synthesize(
        &self,
        sample: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<Vec<OutputPart>> {
        tracing::debug!(
            "Requesting handwriting synthesis from {} ({} byte sample)",
            self.model,
            sample.len()
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: base64::engine::general_purpose::STANDARD.encode(sample),
                        },
                    },
                    Part::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
            }),
        };

        let response: GenerateContentResponse =
            self.http.generate_content(&self.model, &request).await?;
        Self::to_output_parts(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamErrorKind;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

    fn make_client(server: &MockServer) -> GeminiHandwritingClient {
        GeminiHandwritingClient::new(
            GeminiHttpClient::new("key".to_string(), Duration::from_secs(5))
                .with_base_url(server.uri()),
            DEFAULT_MODEL.to_string(),
        )
    }

    #[tokio::test]
    async fn test_synthesize_preserves_part_order() {
        let server = MockServer::start().await;

        let fake_image = vec![0x89, 0x50, 0x4E, 0x47];
        let b64 = base64::engine::general_purpose::STANDARD.encode(&fake_image);

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash-image:generateContent"))
            .and(body_string_contains("\"responseModalities\":[\"TEXT\",\"IMAGE\"]"))
            .and(body_string_contains("\"mimeType\":\"image/jpeg\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "parts": [
                            {"text": "Here you go"},
                            {"inlineData": {"mimeType": "image/png", "data": b64}}
                        ]
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let parts = make_client(&server)
            .synthesize(&[0xFF, 0xD8, 0xFF], "image/jpeg", "write x = 2")
            .await
            .unwrap();

        assert_eq!(
            parts,
            vec![
                OutputPart::Text("Here you go".to_string()),
                OutputPart::Image {
                    mime_type: "image/png".to_string(),
                    data: fake_image,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_quota_error_is_classified() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .synthesize(&[0x00], "image/png", "p")
            .await
            .unwrap_err();
        match err {
            Error::Upstream(e) => assert_eq!(e.kind, UpstreamErrorKind::Quota),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_synthesize_rejects_invalid_base64() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "parts": [{
                            "inlineData": {
                                "mimeType": "image/png",
                                "data": "!!!invalid-base64!!!"
                            }
                        }]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .synthesize(&[0x00], "image/png", "p")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedOutput(_)));
    }

    #[tokio::test]
    async fn test_empty_candidates_yield_no_parts() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": []
            })))
            .mount(&server)
            .await;

        let parts = make_client(&server)
            .synthesize(&[0x00], "image/png", "p")
            .await
            .unwrap();
        assert!(parts.is_empty());
    }
}
