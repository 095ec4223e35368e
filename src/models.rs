//! Data models and structures
//!
//! Defines conversation turns, attachments, prompt payloads, the observable
//! reasoning state, and environment-driven configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One recorded message in a session's conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
}

/// Binary media sent alongside the text of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub kind: MediaKind,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(kind: MediaKind, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            kind,
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Image attachment with its MIME type sniffed from the bytes.
    pub fn image(data: Vec<u8>) -> Self {
        let mime_type = crate::media::detect_image_mime(&data);
        Self::new(MediaKind::Image, mime_type, data)
    }

    /// Audio attachment with its MIME type sniffed from the bytes.
    pub fn audio(data: Vec<u8>) -> Self {
        let mime_type = crate::media::detect_audio_mime(&data);
        Self::new(MediaKind::Audio, mime_type, data)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PromptPart {
    Media {
        kind: MediaKind,
        mime_type: String,
        data: Vec<u8>,
    },
    Text(String),
}

/// Ordered request payload: media parts first, then one composed text part.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Prompt {
    pub parts: Vec<PromptPart>,
}

impl Prompt {
    /// The composed instruction text, if present.
    pub fn text(&self) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            PromptPart::Text(text) => Some(text.as_str()),
            PromptPart::Media { .. } => None,
        })
    }

    pub fn media_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|part| matches!(part, PromptPart::Media { .. }))
            .count()
    }
}

/// One incremental piece of streamed model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
}

impl Chunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Observable state of a reasoning session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReasoningState {
    /// Nothing submitted yet.
    #[default]
    Initial,
    Loading,
    /// Text received so far; republished with growing content per chunk.
    Success(String),
    Error(String),
}

impl ReasoningState {
    /// Success and Error end a request.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReasoningState::Success(_) | ReasoningState::Error(_))
    }
}

/// What `submit` does with empty (or whitespace-only) input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyInputPolicy {
    /// Drop the submission without touching the state.
    #[default]
    Ignore,
    /// Publish an `Error` state explaining the input was empty.
    Reject,
}

impl FromStr for EmptyInputPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "reject" | "error" => Ok(Self::Reject),
            other => Err(crate::Error::Config(format!(
                "Invalid empty input policy '{}'. Expected 'ignore' or 'reject'",
                other
            ))),
        }
    }
}

/// What `submit` does while an earlier request is still streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InFlightPolicy {
    /// Cancel the running request and start the new one.
    #[default]
    Replace,
    /// Refuse the new submission.
    Reject,
}

impl FromStr for InFlightPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "reject" => Ok(Self::Reject),
            other => Err(crate::Error::Config(format!(
                "Invalid in-flight policy '{}'. Expected 'replace' or 'reject'",
                other
            ))),
        }
    }
}

// Configuration
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_IMAGE_MAX_DIMENSION: u32 = 768;

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub temperature: f32,
    pub stream_idle_timeout: Duration,
    pub empty_input_policy: EmptyInputPolicy,
    pub in_flight_policy: InFlightPolicy,
    pub image_max_dimension: u32,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let gemini_api_key = lookup("GEMINI_API_KEY")
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| crate::Error::Config("GEMINI_API_KEY not set".to_string()))?;

        let temperature = match lookup("GEMINI_TEMPERATURE") {
            Some(raw) => raw.trim().parse::<f32>().map_err(|_| {
                crate::Error::Config(format!("Invalid GEMINI_TEMPERATURE '{}'", raw))
            })?,
            None => DEFAULT_TEMPERATURE,
        };

        let idle_secs = parse_u64(&lookup, "STREAM_IDLE_TIMEOUT_SECS")?
            .unwrap_or(DEFAULT_STREAM_IDLE_TIMEOUT_SECS);

        let image_max_dimension = match parse_u64(&lookup, "IMAGE_MAX_DIMENSION")? {
            Some(0) => {
                return Err(crate::Error::Config(
                    "IMAGE_MAX_DIMENSION must be greater than zero".to_string(),
                ))
            }
            Some(value) => u32::try_from(value).map_err(|_| {
                crate::Error::Config(format!("IMAGE_MAX_DIMENSION too large: {}", value))
            })?,
            None => DEFAULT_IMAGE_MAX_DIMENSION,
        };

        Ok(Self {
            gemini_api_key,
            gemini_model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature,
            stream_idle_timeout: Duration::from_secs(idle_secs),
            empty_input_policy: lookup("EMPTY_INPUT_POLICY")
                .map(|raw| raw.parse::<EmptyInputPolicy>())
                .transpose()?
                .unwrap_or_default(),
            in_flight_policy: lookup("IN_FLIGHT_POLICY")
                .map(|raw| raw.parse::<InFlightPolicy>())
                .transpose()?
                .unwrap_or_default(),
            image_max_dimension,
        })
    }
}

fn parse_u64<F>(lookup: &F, key: &str) -> crate::Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|_| crate::Error::Config(format!("Invalid {} '{}'", key, raw)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_turn_serialization() {
        let turn = ConversationTurn::user("I was flying");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"role\":\"user\""));

        let deserialized: ConversationTurn = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, turn);
    }

    #[test]
    fn test_attachment_constructors_sniff_mime() {
        let image = Attachment::image(vec![0xFF, 0xD8, 0xFF, 0xE0]);
        assert_eq!(image.kind, MediaKind::Image);
        assert_eq!(image.mime_type, "image/jpeg");

        let audio = Attachment::audio(b"fLaC\x00".to_vec());
        assert_eq!(audio.kind, MediaKind::Audio);
        assert_eq!(audio.mime_type, "audio/flac");
    }

    #[test]
    fn test_state_terminality() {
        assert!(!ReasoningState::Initial.is_terminal());
        assert!(!ReasoningState::Loading.is_terminal());
        assert!(ReasoningState::Success("x".to_string()).is_terminal());
        assert!(ReasoningState::Error("x".to_string()).is_terminal());
        assert_eq!(ReasoningState::default(), ReasoningState::Initial);
    }

    #[test]
    fn test_prompt_accessors() {
        let prompt = Prompt {
            parts: vec![
                PromptPart::Media {
                    kind: MediaKind::Image,
                    mime_type: "image/png".to_string(),
                    data: vec![1],
                },
                PromptPart::Text("Dream: falling".to_string()),
            ],
        };
        assert_eq!(prompt.text(), Some("Dream: falling"));
        assert_eq!(prompt.media_count(), 1);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "Ignore".parse::<EmptyInputPolicy>().unwrap(),
            EmptyInputPolicy::Ignore
        );
        assert_eq!(
            "error".parse::<EmptyInputPolicy>().unwrap(),
            EmptyInputPolicy::Reject
        );
        assert_eq!(
            "reject".parse::<InFlightPolicy>().unwrap(),
            InFlightPolicy::Reject
        );
        assert!("sometimes".parse::<InFlightPolicy>().is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(lookup_from(&[("GEMINI_API_KEY", "key")])).unwrap();
        assert_eq!(config.gemini_model, DEFAULT_MODEL);
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(config.stream_idle_timeout, Duration::from_secs(60));
        assert_eq!(config.empty_input_policy, EmptyInputPolicy::Ignore);
        assert_eq!(config.in_flight_policy, InFlightPolicy::Replace);
        assert_eq!(config.image_max_dimension, 768);
    }

    #[test]
    fn test_config_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "key"),
            ("GEMINI_MODEL", "gemini-2.5-pro"),
            ("GEMINI_TEMPERATURE", "0.2"),
            ("STREAM_IDLE_TIMEOUT_SECS", "5"),
            ("EMPTY_INPUT_POLICY", "reject"),
            ("IN_FLIGHT_POLICY", "reject"),
            ("IMAGE_MAX_DIMENSION", "512"),
        ]))
        .unwrap();
        assert_eq!(config.gemini_model, "gemini-2.5-pro");
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.stream_idle_timeout, Duration::from_secs(5));
        assert_eq!(config.empty_input_policy, EmptyInputPolicy::Reject);
        assert_eq!(config.in_flight_policy, InFlightPolicy::Reject);
        assert_eq!(config.image_max_dimension, 512);
    }

    #[test]
    fn test_config_requires_api_key() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));

        let err = Config::from_lookup(lookup_from(&[("GEMINI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_config_rejects_bad_numbers() {
        let err = Config::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "key"),
            ("STREAM_IDLE_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("STREAM_IDLE_TIMEOUT_SECS"));

        let err = Config::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "key"),
            ("IMAGE_MAX_DIMENSION", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
