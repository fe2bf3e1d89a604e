use tracing::debug;

use crate::database::Message;
use crate::models::chat::ChatTurn;

/// Number of prior messages sent to the LLM for conversational continuity.
const DEFAULT_CONTEXT_MESSAGES: usize = 5;

/// Assembles the bounded recent-message window sent as conversation context.
/// The new user message is appended after this window by the chat flow.
pub struct ContextBuilder {
    max_context_messages: usize,
}

impl ContextBuilder {
    pub fn new(max_context_messages: usize) -> Self {
        Self {
            max_context_messages: max_context_messages.max(1),
        }
    }

    pub fn max_context_messages(&self) -> usize {
        self.max_context_messages
    }

    /// At most the N most recent messages from `history`, oldest first.
    /// `history` must already be in chronological order.
    pub fn build_context(&self, history: &[Message]) -> Vec<ChatTurn> {
        let start = history.len().saturating_sub(self.max_context_messages);
        let window: Vec<ChatTurn> = history[start..].iter().map(ChatTurn::from).collect();

        debug!(
            "Built context window: {} of {} messages",
            window.len(),
            history.len()
        );
        window
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_MESSAGES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MessageRole;
    use chrono::{Duration, Utc};

    fn message(id: i64, role: MessageRole, content: &str) -> Message {
        Message {
            id,
            conversation_id: 1,
            role,
            content: content.to_string(),
            tokens_used: 0,
            model: None,
            created_at: Utc::now() + Duration::seconds(id),
            metadata: serde_json::json!({}),
        }
    }

    fn alternating_history(turns: &[&str]) -> Vec<Message> {
        turns
            .iter()
            .enumerate()
            .map(|(i, content)| {
                let role = if content.starts_with('u') {
                    MessageRole::User
                } else {
                    MessageRole::Assistant
                };
                message(i as i64 + 1, role, content)
            })
            .collect()
    }

    #[test]
    fn test_short_history_returned_whole() {
        let builder = ContextBuilder::default();
        let history = alternating_history(&["u1", "a1", "u2"]);

        let context = builder.build_context(&history);
        assert_eq!(context.len(), 3);
        assert_eq!(context[0].content, "u1");
        assert_eq!(context[2].content, "u2");
    }

    #[test]
    fn test_empty_history() {
        let builder = ContextBuilder::default();
        assert!(builder.build_context(&[]).is_empty());
    }

    #[test]
    fn test_window_never_exceeds_limit() {
        let builder = ContextBuilder::default();
        let turns: Vec<String> = (1..=40)
            .map(|i| {
                if i % 2 == 1 {
                    format!("u{}", i / 2 + 1)
                } else {
                    format!("a{}", i / 2)
                }
            })
            .collect();
        let refs: Vec<&str> = turns.iter().map(String::as_str).collect();
        let history = alternating_history(&refs);

        let context = builder.build_context(&history);
        assert_eq!(context.len(), 5);
    }

    #[test]
    fn test_eleven_message_window() {
        // History [u1,a1,u2,a2,u3,a3,u4,a4,u5,a5] followed by new u6:
        // the context window for the next call is exactly [a3,u4,a4,u5,a5],
        // order preserved; u6 is appended separately by the chat flow.
        let builder = ContextBuilder::default();
        let history =
            alternating_history(&["u1", "a1", "u2", "a2", "u3", "a3", "u4", "a4", "u5", "a5"]);

        let mut turns = builder.build_context(&history);
        let expected: Vec<ChatTurn> = vec![
            ChatTurn::new("assistant", "a3"),
            ChatTurn::new("user", "u4"),
            ChatTurn::new("assistant", "a4"),
            ChatTurn::new("user", "u5"),
            ChatTurn::new("assistant", "a5"),
        ];
        assert_eq!(turns, expected);

        turns.push(ChatTurn::new("user", "u6"));
        assert_eq!(turns.len(), 6);
        assert_eq!(turns.last().unwrap().content, "u6");
    }

    #[test]
    fn test_roles_preserved() {
        let builder = ContextBuilder::new(2);
        let history = alternating_history(&["u1", "a1"]);

        let context = builder.build_context(&history);
        assert_eq!(context[0].role, "user");
        assert_eq!(context[1].role, "assistant");
    }
}
