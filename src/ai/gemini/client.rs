use super::error::classify;
use crate::ai::ByteStream;
use crate::error::UpstreamError;
use crate::models::DEFAULT_BASE_URL;
use crate::{Error, Result};
use futures::TryStreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Lightweight Gemini REST client shared by the analysis and handwriting clients.
#[derive(Clone)]
pub struct GeminiHttpClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiHttpClient {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self::new_with_client(api_key, timeout, Client::new())
    }

    pub fn new_with_client(api_key: String, timeout: Duration, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Builds `{base}/v1beta/models/{model}:{method}`.
    ///
    /// `model` may be given bare (`gemini-2.5-flash`) or `models/`-prefixed.
    fn endpoint(&self, model: &str, method: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/v1beta/models/{}:{}", self.base_url, model, method)
    }

    /// Sends the request and turns any non-2xx status into a classified
    /// [`UpstreamError`]. `timeout` bounds the whole exchange including the
    /// body, so streaming calls pass `None`.
    async fn send<Req: Serialize>(
        &self,
        url: String,
        request: &Req,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response> {
        let mut builder = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("Failed to send request to Gemini: {}", e);
            UpstreamError::transport(e)
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.map_err(UpstreamError::transport)?;
            tracing::error!("Gemini API error (status {}): {}", status, error_text);
            let err = classify(status.as_u16(), &error_text);
            tracing::debug!(kind = %err.kind, retry_after = ?err.retry_after, "Classified Gemini error");
            return Err(err.into());
        }

        Ok(response)
    }

    /// Calls Gemini's `generateContent` endpoint.
    pub async fn generate_content<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        model: &str,
        request: &Req,
    ) -> Result<Resp> {
        let url = self.endpoint(model, "generateContent");
        let response = self.send(url, request, Some(self.timeout)).await?;

        let body = response.text().await.map_err(UpstreamError::transport)?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}\nBody: {}", e, body);
            Error::UnexpectedOutput(format!("Failed to parse Gemini response: {}", e))
        })
    }

    /// Calls Gemini's `streamGenerateContent` endpoint in SSE mode and hands
    /// back the raw body. Dropping the stream closes the upstream connection.
    pub async fn stream_generate_content<Req: Serialize>(
        &self,
        model: &str,
        request: &Req,
    ) -> Result<ByteStream> {
        let url = format!("{}?alt=sse", self.endpoint(model, "streamGenerateContent"));
        let response = self.send(url, request, None).await?;

        let stream = response
            .bytes_stream()
            .map_err(|e| Error::Upstream(UpstreamError::transport(e)));
        Ok(Box::pin(stream))
    }
}
