pub mod client;
pub mod stream;
pub mod types;

pub use client::GeminiHttpClient;
pub use stream::GeminiStreamClient;
