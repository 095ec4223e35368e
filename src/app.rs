//! Terminal front end: loads attachments, submits dreams, and renders the
//! session's state as it streams in.

use crate::ai::GeminiStreamClient;
use crate::feature::Feature;
use crate::media::MediaProcessor;
use crate::models::{Attachment, Config, MediaKind, ReasoningState};
use crate::session::{ReasoningSession, SessionOptions, Submission};
use crate::{Error, Result};
use futures::future::try_join_all;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Couples a reasoning session with attachment preparation.
pub struct App {
    session: ReasoningSession,
    media: MediaProcessor,
}

/// Writes streamed text to the terminal without repeating what it already
/// printed.
#[derive(Debug, Default)]
struct Renderer {
    printed: usize,
    announced_loading: bool,
}

impl Renderer {
    fn render<W: Write>(&mut self, state: &ReasoningState, out: &mut W) -> Result<()> {
        match state {
            ReasoningState::Initial => {}
            ReasoningState::Loading => {
                if !self.announced_loading {
                    info!("Interpreting your dream...");
                    self.announced_loading = true;
                }
            }
            ReasoningState::Success(text) => {
                if let Some(fresh) = text.get(self.printed..) {
                    if !fresh.is_empty() {
                        out.write_all(fresh.as_bytes())?;
                        out.flush()?;
                        self.printed = text.len();
                    }
                }
            }
            // Failures are reported by the caller from the returned state.
            ReasoningState::Error(_) => {}
        }
        Ok(())
    }

    fn finish<W: Write>(&self, out: &mut W) -> Result<()> {
        if self.printed > 0 {
            writeln!(out)?;
        }
        Ok(())
    }
}

impl App {
    /// Build an app from a concrete session, e.g. one backed by a mock model.
    pub fn with_services(session: ReasoningSession, media: MediaProcessor) -> Self {
        Self { session, media }
    }

    /// Construct a Gemini-backed app from configuration.
    pub fn new(config: &Config, feature: Feature) -> Self {
        info!(
            "{} reasoning provider: Gemini (model: {})",
            feature, config.gemini_model
        );

        let client = GeminiStreamClient::new(
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
        )
        .with_temperature(config.temperature)
        .with_idle_timeout(config.stream_idle_timeout);

        let session = ReasoningSession::new(
            feature,
            Arc::new(client),
            SessionOptions {
                empty_input: config.empty_input_policy,
                in_flight: config.in_flight_policy,
            },
        );

        Self::with_services(session, MediaProcessor::new(config.image_max_dimension))
    }

    pub fn session(&self) -> &ReasoningSession {
        &self.session
    }

    /// Load files as attachments: audio for the audio feature, images
    /// otherwise.
    pub async fn load_attachments(&self, paths: &[PathBuf]) -> Result<Vec<Attachment>> {
        let kind = match self.session.feature() {
            Feature::Audio => MediaKind::Audio,
            Feature::Text | Feature::Photo => MediaKind::Image,
        };

        try_join_all(
            paths
                .iter()
                .map(|path| self.media.load_attachment(path, kind)),
        )
        .await
    }

    /// Submit one dream and stream the interpretation into `out`.
    ///
    /// Returns the session's state once the request has finished. A failed
    /// request is reported through the returned `Error` state, not as `Err`.
    pub async fn interpret<W: Write>(
        &self,
        dream: &str,
        attachments: &[Attachment],
        out: &mut W,
    ) -> Result<ReasoningState> {
        let mut watcher = self.session.subscribe();

        let handle = match self.session.submit(dream, attachments) {
            Submission::Started(handle) => handle,
            Submission::Ignored => {
                info!("Nothing to interpret");
                return Ok(self.session.state());
            }
            Submission::Rejected => return Ok(self.session.state()),
            Submission::Busy => {
                return Err(Error::Validation(
                    "A dream is already being interpreted".to_string(),
                ))
            }
        };

        let mut renderer = Renderer::default();
        let finished = handle.finished();
        tokio::pin!(finished);

        loop {
            tokio::select! {
                _ = &mut finished => break,
                changed = watcher.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = watcher.borrow_and_update().clone();
                    renderer.render(&state, out)?;
                }
            }
        }

        // The task may finish before the last publication was observed.
        let final_state = self.session.state();
        renderer.render(&final_state, out)?;
        renderer.finish(out)?;
        Ok(final_state)
    }
}
