//! Free-form chat about a concept, with a bounded conversation window

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::types::{Message, MessageRole};

/// Prior turns sent along with a new message
pub const CHAT_HISTORY_TURNS: usize = 8;

/// One prior turn of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    #[serde(default = "default_role")]
    pub role: MessageRole,
    #[serde(default)]
    pub text: String,
}

fn default_role() -> MessageRole {
    MessageRole::User
}

impl ChatTurn {
    pub fn new(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Build the request messages for a chat call
///
/// Keeps the last [`CHAT_HISTORY_TURNS`] turns of `history` and appends the
/// new user message. A blank message is rejected.
pub fn chat_messages(message: &str, history: &[ChatTurn]) -> Result<Vec<Message>> {
    let message = message.trim();
    if message.is_empty() {
        return Err(Error::InvalidInput("empty message".to_string()));
    }

    let recent = &history[history.len().saturating_sub(CHAT_HISTORY_TURNS)..];
    let mut messages: Vec<Message> = recent
        .iter()
        .map(|turn| match turn.role {
            MessageRole::System => Message::system(turn.text.as_str()),
            MessageRole::User => Message::user(turn.text.as_str()),
            MessageRole::Assistant => Message::assistant(turn.text.as_str()),
        })
        .collect();
    messages.push(Message::user(message));
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(turns: usize) -> Vec<ChatTurn> {
        (0..turns)
            .map(|i| {
                let role = if i % 2 == 0 {
                    MessageRole::User
                } else {
                    MessageRole::Assistant
                };
                ChatTurn::new(role, format!("turn {}", i))
            })
            .collect()
    }

    #[test]
    fn test_history_truncated_to_recent_turns() {
        let messages = chat_messages("熵和信息有什么关系？", &conversation(12)).unwrap();

        assert_eq!(messages.len(), CHAT_HISTORY_TURNS + 1);
        assert_eq!(messages[0].content, "turn 4");
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[7].content, "turn 11");

        let last = messages.last().unwrap();
        assert_eq!(last.role, MessageRole::User);
        assert_eq!(last.content, "熵和信息有什么关系？");
    }

    #[test]
    fn test_short_history_kept_whole() {
        let messages = chat_messages("继续", &conversation(3)).unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].content, "turn 0");

        let messages = chat_messages("你好", &[]).unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_turn_roles_carried_over() {
        let history = vec![
            ChatTurn::new(MessageRole::System, "用中文回答"),
            ChatTurn::new(MessageRole::Assistant, "好的"),
        ];
        let messages = chat_messages("熵", &history).unwrap();
        let roles: Vec<MessageRole> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::System, MessageRole::Assistant, MessageRole::User]
        );
    }

    #[test]
    fn test_empty_message_rejected() {
        let err = chat_messages("   ", &conversation(2)).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(err.code(), "E800");
        assert!(chat_messages("", &[]).is_err());
    }

    #[test]
    fn test_turn_role_defaults_to_user() {
        let turns: Vec<ChatTurn> =
            serde_json::from_str(r#"[{"text": "你好"}, {"role": "assistant", "text": "您好"}]"#)
                .unwrap();
        assert_eq!(turns[0].role, MessageRole::User);
        assert_eq!(turns[1], ChatTurn::new(MessageRole::Assistant, "您好"));
    }
}
