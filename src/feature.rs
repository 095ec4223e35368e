//! Reasoning presets: which template a session uses and whether it keeps
//! conversation history.

use crate::prompts;
use clap::ValueEnum;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Feature {
    /// Dream-weaver chat that remembers earlier turns.
    Text,
    /// Single-shot interpretation with optional photos.
    Photo,
    /// Single-shot interpretation of attached audio.
    Audio,
}

impl Feature {
    pub fn template(&self) -> &'static str {
        match self {
            Feature::Text => prompts::TEXT_REASONING,
            Feature::Photo => prompts::PHOTO_REASONING,
            Feature::Audio => prompts::AUDIO_REASONING,
        }
    }

    pub fn history_enabled(&self) -> bool {
        matches!(self, Feature::Text)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Feature::Text => "text",
            Feature::Photo => "photo",
            Feature::Audio => "audio",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_text_keeps_history() {
        assert!(Feature::Text.history_enabled());
        assert!(!Feature::Photo.history_enabled());
        assert!(!Feature::Audio.history_enabled());
    }

    #[test]
    fn test_templates_differ_per_feature() {
        assert_ne!(Feature::Text.template(), Feature::Photo.template());
        assert_ne!(Feature::Photo.template(), Feature::Audio.template());
    }

    #[test]
    fn test_display_matches_cli_value() {
        for feature in [Feature::Text, Feature::Photo, Feature::Audio] {
            let parsed = Feature::from_str(&feature.to_string(), false).unwrap();
            assert_eq!(parsed, feature);
        }
    }
}
