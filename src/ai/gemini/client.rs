use crate::{Error, Result};
use reqwest::{Client, Response};
use serde::Serialize;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Lightweight Gemini REST client for streaming content generation.
pub struct GeminiHttpClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiHttpClient {
    /// Construct a Gemini client.
    ///
    /// `model` should be the bare model ID (for example `gemini-2.0-flash`);
    /// a `models/` prefix is stripped.
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: Client) -> Self {
        let model = model.strip_prefix("models/").unwrap_or(&model).to_string();

        Self {
            client,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Returns the configured model ID without the `models/` prefix.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }

    /// Calls Gemini's `streamGenerateContent` endpoint and returns the open
    /// response once the status has been checked.
    pub async fn stream_generate_content<Req: Serialize>(&self, request: &Req) -> Result<Response> {
        let response = self
            .client
            .post(self.stream_url())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Gemini: {}", e);
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            tracing::error!("Gemini API error (status {}): {}", status, error_text);
            return Err(Error::Protocol(format!(
                "Gemini API error (status {}): {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_models_prefix() {
        let client = GeminiHttpClient::new("key".to_string(), "models/gemini-2.0-flash".to_string());
        assert_eq!(client.model(), "gemini-2.0-flash");
    }

    #[test]
    fn test_stream_url() {
        let client = GeminiHttpClient::new("key".to_string(), "gemini-2.0-flash".to_string())
            .with_base_url("http://localhost:1234/".to_string());
        assert_eq!(
            client.stream_url(),
            "http://localhost:1234/v1beta/models/gemini-2.0-flash:streamGenerateContent?alt=sse"
        );
    }
}
