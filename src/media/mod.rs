//! Attachment preparation
//!
//! Sniffs media types and shrinks images before they are attached to a
//! request, keeping uploads small.

pub mod mime;
pub mod processor;

pub use mime::{detect_audio_mime, detect_image_mime};
pub use processor::MediaProcessor;
