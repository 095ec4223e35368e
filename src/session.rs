//! Reasoning session: turns one user submission into a streamed model request
//! and publishes the resulting state transitions.

use crate::ai::ModelClient;
use crate::feature::Feature;
use crate::history::ConversationState;
use crate::models::{
    Attachment, ConversationTurn, EmptyInputPolicy, InFlightPolicy, Prompt, ReasoningState,
};
use crate::prompts;
use crate::state::{StatePublisher, StateWatcher};
use crate::Error;
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

/// Published when empty input is rejected.
pub const EMPTY_INPUT_MESSAGE: &str = "Please describe your dream before submitting.";

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    pub empty_input: EmptyInputPolicy,
    pub in_flight: InFlightPolicy,
}

/// Outcome of [`ReasoningSession::submit`].
#[derive(Debug)]
pub enum Submission {
    /// A request was started; its progress is observed through the state.
    Started(RequestHandle),
    /// Empty input dropped without a state change.
    Ignored,
    /// Empty input refused.
    Rejected,
    /// Another request is in flight and the session refuses overlap.
    Busy,
}

impl Submission {
    pub fn is_started(&self) -> bool {
        matches!(self, Submission::Started(_))
    }
}

/// Handle on a started request. Dropping it does not stop the request.
#[derive(Debug)]
pub struct RequestHandle {
    id: u64,
    task: JoinHandle<()>,
}

impl RequestHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait until the request's task has exited.
    pub async fn finished(self) {
        if let Err(e) = self.task.await {
            error!("Request {} task failed: {}", self.id, e);
        }
    }
}

struct ActiveRequest {
    id: u64,
    cancel: CancellationToken,
}

struct SessionInner {
    id: Uuid,
    feature: Feature,
    client: Arc<dyn ModelClient>,
    options: SessionOptions,
    publisher: StatePublisher,
    // Lock order: `active` before `history`.
    active: Mutex<Option<ActiveRequest>>,
    history: Mutex<ConversationState>,
    next_request_id: AtomicU64,
}

/// Orchestrates requests for one feature and exposes their state.
///
/// Must be used from within a tokio runtime: `submit` spawns the streaming
/// work. Dropping the session cancels any in-flight stream.
pub struct ReasoningSession {
    inner: Arc<SessionInner>,
    shutdown: CancellationToken,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ReasoningSession {
    pub fn new(feature: Feature, client: Arc<dyn ModelClient>, options: SessionOptions) -> Self {
        let id = Uuid::new_v4();
        info!(
            "Created {} reasoning session {} (empty input: {:?}, in flight: {:?})",
            feature, id, options.empty_input, options.in_flight
        );

        Self {
            inner: Arc::new(SessionInner {
                id,
                feature,
                client,
                options,
                publisher: StatePublisher::new(),
                active: Mutex::new(None),
                history: Mutex::new(ConversationState::new()),
                next_request_id: AtomicU64::new(0),
            }),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn feature(&self) -> Feature {
        self.inner.feature
    }

    pub fn state(&self) -> ReasoningState {
        self.inner.publisher.current()
    }

    pub fn subscribe(&self) -> StateWatcher {
        self.inner.publisher.subscribe()
    }

    pub fn history(&self) -> Vec<ConversationTurn> {
        lock(&self.inner.history).turns().to_vec()
    }

    pub fn history_context(&self) -> String {
        lock(&self.inner.history).render_as_context()
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.inner.active).is_some()
    }

    /// Submit a dream description with optional media.
    ///
    /// Publishes `Loading` synchronously when a request starts; chunks and
    /// the outcome arrive through [`subscribe`](Self::subscribe).
    pub fn submit(&self, user_input: &str, attachments: &[Attachment]) -> Submission {
        let inner = &self.inner;
        let mut active = lock(&inner.active);

        if user_input.trim().is_empty() {
            return match inner.options.empty_input {
                EmptyInputPolicy::Ignore => {
                    debug!("Ignoring empty submission");
                    Submission::Ignored
                }
                EmptyInputPolicy::Reject if active.is_some() => {
                    warn!("Rejected empty submission while a request is streaming");
                    Submission::Rejected
                }
                EmptyInputPolicy::Reject => {
                    warn!("Rejected empty submission");
                    inner
                        .publisher
                        .publish(ReasoningState::Error(EMPTY_INPUT_MESSAGE.to_string()));
                    Submission::Rejected
                }
            };
        }

        if let Some(current) = active.as_ref() {
            match inner.options.in_flight {
                InFlightPolicy::Reject => {
                    warn!("Request {} still streaming, rejecting submission", current.id);
                    return Submission::Busy;
                }
                InFlightPolicy::Replace => {
                    info!("Superseding request {}", current.id);
                    current.cancel.cancel();
                }
            }
        }

        let id = inner.next_request_id.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = self.shutdown.child_token();
        *active = Some(ActiveRequest {
            id,
            cancel: cancel.clone(),
        });

        let prompt = {
            let mut history = lock(&inner.history);
            if inner.feature.history_enabled() {
                history.append(ConversationTurn::user(user_input));
            }
            prompts::build(
                inner.feature.template(),
                user_input,
                history.turns(),
                attachments,
            )
        };

        inner.publisher.publish(ReasoningState::Loading);
        drop(active);

        info!(
            "Submitting request {} ({} chars, {} attachments)",
            id,
            user_input.len(),
            attachments.len()
        );

        let span = tracing::info_span!("request", session = %inner.id, request = id);
        let task = tokio::spawn({
            let inner = Arc::clone(inner);
            async move { inner.run_request(id, prompt, cancel).await }.instrument(span)
        });

        Submission::Started(RequestHandle { id, task })
    }

    /// Cancel the in-flight request, if any, publishing an `Error` state.
    pub fn cancel(&self) -> bool {
        let mut active = lock(&self.inner.active);
        match active.take() {
            Some(request) => {
                info!("Cancelling request {}", request.id);
                request.cancel.cancel();
                self.inner
                    .publisher
                    .publish(ReasoningState::Error(Error::Cancelled.user_message()));
                true
            }
            None => false,
        }
    }
}

impl Drop for ReasoningSession {
    fn drop(&mut self) {
        debug!("Tearing down session {}", self.inner.id);
        self.shutdown.cancel();
    }
}

impl SessionInner {
    async fn run_request(&self, id: u64, prompt: Prompt, cancel: CancellationToken) {
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Cancelled before the stream opened");
                return;
            }
            opened = self.client.stream_generate(&prompt, cancel.clone()) => opened,
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                self.fail(id, e);
                return;
            }
        };

        let mut output = String::new();
        let mut chunk_count = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Cancelled after {} chunks", chunk_count);
                    return;
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    output.push_str(&chunk.text);
                    chunk_count += 1;
                    if !self.publish_if_active(id, ReasoningState::Success(output.clone())) {
                        debug!("Superseded after {} chunks", chunk_count);
                        return;
                    }
                }
                Some(Err(e)) => {
                    self.fail(id, e);
                    return;
                }
                None => break,
            }
        }

        self.complete(id, output, chunk_count);
    }

    fn publish_if_active(&self, id: u64, state: ReasoningState) -> bool {
        let active = lock(&self.active);
        if active.as_ref().map(|request| request.id) != Some(id) {
            return false;
        }
        self.publisher.publish(state);
        true
    }

    fn fail(&self, id: u64, e: Error) {
        let mut active = lock(&self.active);
        if active.as_ref().map(|request| request.id) != Some(id) {
            debug!("Dropping failure from stale request: {}", e);
            return;
        }
        if e.is_transport() {
            warn!("Request failed on the network: {}", e);
        } else {
            error!("Request failed: {}", e);
        }
        self.publisher
            .publish(ReasoningState::Error(e.user_message()));
        *active = None;
    }

    fn complete(&self, id: u64, output: String, chunk_count: usize) {
        let mut active = lock(&self.active);
        if active.as_ref().map(|request| request.id) != Some(id) {
            debug!("Discarding completion of stale request");
            return;
        }

        if chunk_count == 0 {
            warn!("Stream finished without any text");
            self.publisher.publish(ReasoningState::Success(String::new()));
        }

        info!("Request complete ({} chunks, {} chars)", chunk_count, output.len());
        if self.feature.history_enabled() {
            lock(&self.history).append(ConversationTurn::model(output));
        }
        *active = None;
    }
}
