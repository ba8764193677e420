use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One conversation with the chat service.
///
/// The id is minted once and passed unchanged on every chat call; the remote
/// service keeps its own history keyed by it. The local turn list is
/// append-only bookkeeping and is never replayed into prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: Uuid,
    pub turns: Vec<ConversationTurn>,
    pub created_at: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            turns: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn push_turn(&mut self, role: Role, text: impl Into<String>) {
        self.turns.push(ConversationTurn {
            role,
            text: text.into(),
        });
    }

    pub fn last_assistant_turn(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| matches!(t.role, Role::Assistant))
            .map(|t| t.text.as_str())
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turns_are_append_only() {
        let mut session = ConversationSession::new();
        session.push_turn(Role::User, "hello");
        session.push_turn(Role::Assistant, "hi");
        session.push_turn(Role::User, "bye");

        assert_eq!(session.turns.len(), 3);
        assert_eq!(session.last_assistant_turn(), Some("hi"));
    }

    #[test]
    fn test_sessions_get_distinct_ids() {
        assert_ne!(ConversationSession::new().id, ConversationSession::new().id);
    }
}
