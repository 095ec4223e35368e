//! Conversation history used as context for follow-up prompts.

use crate::models::ConversationTurn;

/// Insertion-ordered, unbounded transcript of a session.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    turns: Vec<ConversationTurn>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    /// All turn texts joined with newlines, oldest first.
    pub fn render_as_context(&self) -> String {
        render_turns(&self.turns)
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

pub(crate) fn render_turns(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|turn| turn.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_render_joins_in_insertion_order() {
        let mut history = ConversationState::new();
        history.append(ConversationTurn::user("U1"));
        history.append(ConversationTurn::model("M1"));
        history.append(ConversationTurn::user("U2"));

        assert_eq!(history.render_as_context(), "U1\nM1\nU2");
        assert_eq!(history.len(), 3);
        assert_eq!(history.turns()[1].role, Role::Model);
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut history = ConversationState::new();
        history.append(ConversationTurn::user("a cat with an owl's head"));
        history.append(ConversationTurn::model("Watchfulness."));

        let first = history.render_as_context();
        let second = history.render_as_context();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_history_renders_empty_string() {
        let history = ConversationState::new();
        assert!(history.is_empty());
        assert_eq!(history.render_as_context(), "");
    }
}
