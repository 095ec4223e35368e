//! Prompt templates and request payload assembly.

use crate::history::render_turns;
use crate::models::{Attachment, ConversationTurn, Prompt, PromptPart};

pub const TEXT_REASONING: &str = include_str!("../data/prompts/text_reasoning.txt");
pub const PHOTO_REASONING: &str = include_str!("../data/prompts/photo_reasoning.txt");
pub const AUDIO_REASONING: &str = include_str!("../data/prompts/audio_reasoning.txt");

/// Replace `{{key}}` placeholders in a template string.
///
/// Placeholders are resolved in a single pass over the template, so a value
/// that itself contains `{{...}}` is inserted verbatim. Unknown placeholders
/// are left as they are.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            rest = &rest[start..];
            break;
        };

        let key = &after_open[..end];
        match vars.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => result.push_str(value),
            None => result.push_str(&rest[start..start + end + 4]),
        }
        rest = &after_open[end + 2..];
    }

    result.push_str(rest);
    result
}

/// Assemble a request: one media part per attachment, in order, followed by
/// the template rendered with `{{input}}` and `{{history}}`.
///
/// `user_input` is expected to be non-empty; callers validate it.
pub fn build(
    template: &str,
    user_input: &str,
    history: &[ConversationTurn],
    attachments: &[Attachment],
) -> Prompt {
    let history_text = render_turns(history);
    let text = render(
        template,
        &[("input", user_input), ("history", &history_text)],
    );

    let mut parts: Vec<PromptPart> = attachments
        .iter()
        .map(|attachment| PromptPart::Media {
            kind: attachment.kind,
            mime_type: attachment.mime_type.clone(),
            data: attachment.data.clone(),
        })
        .collect();
    parts.push(PromptPart::Text(text));

    Prompt { parts }
}
