//! Generative model integration
//!
//! Defines the streaming completion seam the reasoning session talks to,
//! along with the Gemini implementation and a scriptable mock.

pub mod gemini;
pub mod mock;

pub use gemini::GeminiStreamClient;
pub use mock::{MockModelClient, MockStreamFeeder};

use crate::models::{Chunk, Prompt};
use crate::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

/// Incremental text chunks, ended normally or by an error item.
pub type ChunkStream = BoxStream<'static, Result<Chunk>>;

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Start a streaming completion for `prompt`.
    ///
    /// Implementations stop producing chunks once `cancel` fires.
    async fn stream_generate(
        &self,
        prompt: &Prompt,
        cancel: CancellationToken,
    ) -> Result<ChunkStream>;
}
