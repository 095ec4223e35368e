//! Dream interpretation client for iamdreamingof.com
//!
//! Sends a dream description, optionally with photos or audio, to a hosted
//! generative model and exposes the streamed interpretation as an observable
//! state (Initial, Loading, Success, Error).

pub mod ai;
pub mod app;
pub mod error;
pub mod feature;
pub mod history;
pub mod media;
pub mod models;
pub mod prompts;
pub mod session;
pub mod state;

pub use error::{Error, Result};
pub use feature::Feature;
pub use models::ReasoningState;
pub use session::{ReasoningSession, SessionOptions, Submission};
