use super::client::GeminiHttpClient;
use super::types::{
    Content, GenerateContentResponse, GenerationConfig, InlineData, Part, StreamGenerateRequest,
};
use crate::ai::{ChunkStream, ModelClient};
use crate::models::{Chunk, Prompt, PromptPart, DEFAULT_STREAM_IDLE_TIMEOUT_SECS};
use crate::{Error, Result};
use async_trait::async_trait;
use base64::Engine as _;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::stream::{self, BoxStream, StreamExt};
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Finish reasons that end a candidate without it being a failure.
const NORMAL_FINISH_REASONS: &[&str] = &["STOP", "MAX_TOKENS", "FINISH_REASON_UNSPECIFIED"];

type SseEvents = BoxStream<'static, std::result::Result<Event, EventStreamError<reqwest::Error>>>;

struct SseState {
    events: SseEvents,
    cancel: CancellationToken,
    idle_timeout: Duration,
}

/// Streams completions from Gemini's `streamGenerateContent` SSE endpoint.
pub struct GeminiStreamClient {
    http: GeminiHttpClient,
    temperature: Option<f32>,
    idle_timeout: Duration,
}

impl GeminiStreamClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(api_key, model, client),
            temperature: None,
            idle_timeout: Duration::from_secs(DEFAULT_STREAM_IDLE_TIMEOUT_SECS),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Maximum silence tolerated between two stream events.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    pub fn model(&self) -> &str {
        self.http.model()
    }

    fn build_request(&self, prompt: &Prompt) -> StreamGenerateRequest {
        let parts = prompt
            .parts
            .iter()
            .map(|part| match part {
                PromptPart::Media {
                    mime_type, data, ..
                } => Part::InlineData {
                    inline_data: InlineData {
                        mime_type: mime_type.clone(),
                        data: base64::engine::general_purpose::STANDARD.encode(data),
                    },
                },
                PromptPart::Text(text) => Part::Text { text: text.clone() },
            })
            .collect();

        StreamGenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: self.temperature.map(|temperature| GenerationConfig {
                temperature: Some(temperature),
            }),
        }
    }

    /// Decode one SSE `data` payload. `Ok(None)` means the event carried no
    /// text (metadata, usage, or an empty final candidate).
    fn decode_event(data: &str) -> Result<Option<Chunk>> {
        let response: GenerateContentResponse = serde_json::from_str(data).map_err(|e| {
            tracing::error!("Failed to parse Gemini stream event: {}\nData: {}", e, data);
            Error::Protocol(format!("Failed to parse Gemini response: {}", e))
        })?;

        if let Some(error) = response.error {
            let message = error
                .message
                .or(error.status)
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(match error.code {
                Some(code) => Error::Protocol(format!("Gemini API error ({}): {}", code, message)),
                None => Error::Protocol(format!("Gemini API error: {}", message)),
            });
        }

        let Some(candidate) = response.candidates.into_iter().next() else {
            if let Some(reason) = response
                .prompt_feedback
                .and_then(|feedback| feedback.block_reason)
            {
                return Err(Error::Protocol(format!(
                    "Gemini blocked the prompt: {}",
                    reason
                )));
            }
            return Ok(None);
        };

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| match part {
                        Part::Text { text } => Some(text),
                        Part::InlineData { .. } | Part::Other(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return match candidate.finish_reason {
                Some(reason) if !NORMAL_FINISH_REASONS.contains(&reason.as_str()) => Err(
                    Error::Protocol(format!("Gemini stopped the response: {}", reason)),
                ),
                _ => Ok(None),
            };
        }

        Ok(Some(Chunk::new(text)))
    }

    fn into_chunks(state: SseState) -> ChunkStream {
        stream::unfold(Some(state), |state| async move {
            let mut state = state?;
            loop {
                let next = tokio::select! {
                    biased;
                    _ = state.cancel.cancelled() => {
                        tracing::debug!("Gemini stream cancelled");
                        return Some((Err(Error::Cancelled), None));
                    }
                    next = timeout(state.idle_timeout, state.events.next()) => next,
                };

                let event = match next {
                    Err(_) => {
                        let secs = state.idle_timeout.as_secs();
                        tracing::error!("Gemini stream idle for {}s, giving up", secs);
                        return Some((Err(Error::StreamTimeout(secs)), None));
                    }
                    Ok(None) => return None,
                    Ok(Some(Err(EventStreamError::Transport(e)))) => {
                        tracing::error!("Gemini stream transport error: {}", e);
                        return Some((Err(Error::Transport(e)), None));
                    }
                    Ok(Some(Err(e))) => {
                        tracing::error!("Gemini SSE error: {}", e);
                        return Some((
                            Err(Error::Protocol(format!("Malformed Gemini stream: {}", e))),
                            None,
                        ));
                    }
                    Ok(Some(Ok(event))) => event,
                };

                tracing::trace!("Gemini SSE: {:?}", event.data);
                if event.data.trim().is_empty() {
                    continue;
                }

                match Self::decode_event(&event.data) {
                    Ok(Some(chunk)) => return Some((Ok(chunk), Some(state))),
                    Ok(None) => continue,
                    Err(e) => return Some((Err(e), None)),
                }
            }
        })
        .boxed()
    }
}

#[async_trait]
impl ModelClient for GeminiStreamClient {
    async fn stream_generate(
        &self,
        prompt: &Prompt,
        cancel: CancellationToken,
    ) -> Result<ChunkStream> {
        let request = self.build_request(prompt);
        tracing::debug!(
            "Opening Gemini stream (model: {}, {} media parts)",
            self.http.model(),
            prompt.media_count()
        );

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            opened = timeout(self.idle_timeout, self.http.stream_generate_content(&request)) => opened,
        };
        let response = match opened {
            Ok(response) => response?,
            Err(_) => {
                let secs = self.idle_timeout.as_secs();
                tracing::error!("Gemini sent no response headers within {}s", secs);
                return Err(Error::StreamTimeout(secs));
            }
        };

        Ok(Self::into_chunks(SseState {
            events: response.bytes_stream().eventsource().boxed(),
            cancel,
            idle_timeout: self.idle_timeout,
        }))
    }
}
