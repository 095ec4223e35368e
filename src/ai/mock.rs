use super::{ChunkStream, ModelClient};
use crate::models::{Chunk, Prompt};
use crate::{Error, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const DEFAULT_RESPONSE: &str = "A dreamlike interpretation";

enum MockResponse {
    Chunks(Vec<String>),
    ChunksThenError(Vec<String>, String),
    FailToStart(String),
    Fed(mpsc::UnboundedReceiver<Result<Chunk>>),
}

/// Scripted stand-in for a streaming model.
///
/// Each call consumes the next queued response; once the queue is empty every
/// call streams a single default chunk.
#[derive(Clone)]
pub struct MockModelClient {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    prompts: Arc<Mutex<Vec<Prompt>>>,
    call_count: Arc<Mutex<usize>>,
}

/// Sending half of a manually paced mock stream.
pub struct MockStreamFeeder {
    sender: mpsc::UnboundedSender<Result<Chunk>>,
}

impl MockStreamFeeder {
    /// Returns false once the consuming stream is gone.
    pub fn send_chunk(&self, text: &str) -> bool {
        self.sender.send(Ok(Chunk::new(text))).is_ok()
    }

    pub fn fail(&self, error: Error) -> bool {
        self.sender.send(Err(error)).is_ok()
    }

    /// End the stream normally.
    pub fn finish(self) {}

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl MockModelClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_chunks(self, chunks: &[&str]) -> Self {
        self.push(MockResponse::Chunks(to_owned(chunks)));
        self
    }

    pub fn with_chunks_then_error(self, chunks: &[&str], message: &str) -> Self {
        self.push(MockResponse::ChunksThenError(
            to_owned(chunks),
            message.to_string(),
        ));
        self
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.push(MockResponse::FailToStart(message.to_string()));
        self
    }

    /// Queue a stream whose chunks are pushed by the returned feeder.
    pub fn with_feeder(&self) -> MockStreamFeeder {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.push(MockResponse::Fed(receiver));
        MockStreamFeeder { sender }
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }

    fn push(&self, response: MockResponse) {
        self.responses.lock().unwrap().push_back(response);
    }
}

impl Default for MockModelClient {
    fn default() -> Self {
        Self::new()
    }
}

fn to_owned(chunks: &[&str]) -> Vec<String> {
    chunks.iter().map(|chunk| chunk.to_string()).collect()
}

fn chunk_stream(chunks: Vec<String>) -> ChunkStream {
    stream::iter(chunks.into_iter().map(|text| Ok(Chunk::new(text)))).boxed()
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn stream_generate(
        &self,
        prompt: &Prompt,
        cancel: CancellationToken,
    ) -> Result<ChunkStream> {
        *self.call_count.lock().unwrap() += 1;
        self.prompts.lock().unwrap().push(prompt.clone());

        let response = self.responses.lock().unwrap().pop_front();
        let stream = match response {
            None => chunk_stream(vec![DEFAULT_RESPONSE.to_string()]),
            Some(MockResponse::Chunks(chunks)) => chunk_stream(chunks),
            Some(MockResponse::ChunksThenError(chunks, message)) => chunk_stream(chunks)
                .chain(stream::once(async move { Err(Error::Protocol(message)) }))
                .boxed(),
            Some(MockResponse::FailToStart(message)) => return Err(Error::Protocol(message)),
            Some(MockResponse::Fed(receiver)) => {
                stream::unfold(receiver, |mut receiver| async move {
                    receiver.recv().await.map(|item| (item, receiver))
                })
                .boxed()
            }
        };

        Ok(stream.take_until(cancel.cancelled_owned()).boxed())
    }
}
