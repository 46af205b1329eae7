//! The conversation aggregate: a user's ten-question interview.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ConversationId, UserId};
use super::message::{Message, MessageKind, QUESTION_COUNT};

/// A guided interview owned by one user, progressing through ten question
/// slots to completion.
///
/// Invariant: `completed` is true iff `summary` is present and
/// `current_question == QUESTION_COUNT`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    #[serde(skip)]
    pub user_id: UserId,
    pub title: String,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed: bool,
    /// Position in the ten-question sequence, 0 before the first question is
    /// posted. 0 after creation means the first question still needs
    /// generating (a recoverable, visible state).
    pub current_question_number: u8,
}

impl Conversation {
    /// Creates a fresh conversation at slot 0 with no messages.
    pub fn new(user_id: UserId, title: impl Into<String>) -> Self {
        Self {
            id: ConversationId::new(),
            user_id,
            title: title.into(),
            summary: None,
            created_at: Utc::now(),
            completed: false,
            current_question_number: 0,
        }
    }

    /// Whether the current slot is the final one.
    pub fn at_final_question(&self) -> bool {
        self.current_question_number >= QUESTION_COUNT
    }
}

/// A conversation together with its full message history, ordered by
/// creation time ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationWithMessages {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

impl ConversationWithMessages {
    /// The response message at a given slot, if one exists.
    pub fn response_at(&self, number: u8) -> Option<&Message> {
        self.messages
            .iter()
            .find(|m| m.kind == MessageKind::Response { number })
    }

    /// The question message at a given slot, if one exists.
    pub fn question_at(&self, number: u8) -> Option<&Message> {
        self.messages
            .iter()
            .find(|m| m.kind == MessageKind::Question { number })
    }

    /// History with the given slot's question and response removed, used
    /// when regenerating the question for that slot.
    pub fn history_excluding_slot(&self, number: u8) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| m.kind.question_number() != Some(number))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation_with(messages: Vec<(MessageKind, &str)>) -> ConversationWithMessages {
        let conversation = Conversation::new(UserId::new(), "Test");
        let messages = messages
            .into_iter()
            .map(|(kind, content)| Message::new(conversation.id, kind, content))
            .collect();
        ConversationWithMessages {
            conversation,
            messages,
        }
    }

    #[test]
    fn new_conversation_starts_empty_at_slot_zero() {
        let c = Conversation::new(UserId::new(), "Career thoughts");
        assert_eq!(c.current_question_number, 0);
        assert!(!c.completed);
        assert!(c.summary.is_none());
    }

    #[test]
    fn final_question_detection() {
        let mut c = Conversation::new(UserId::new(), "t");
        c.current_question_number = 9;
        assert!(!c.at_final_question());
        c.current_question_number = 10;
        assert!(c.at_final_question());
    }

    #[test]
    fn history_excluding_slot_keeps_other_slots_and_summaries() {
        let with = conversation_with(vec![
            (MessageKind::Question { number: 1 }, "q1"),
            (MessageKind::Response { number: 1 }, "r1"),
            (MessageKind::Question { number: 2 }, "q2"),
        ]);
        let history = with.history_excluding_slot(2);
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|m| m.kind.question_number() != Some(2)));
    }

    #[test]
    fn response_lookup_by_slot() {
        let with = conversation_with(vec![
            (MessageKind::Question { number: 1 }, "q1"),
            (MessageKind::Response { number: 1 }, "r1"),
        ]);
        assert!(with.response_at(1).is_some());
        assert!(with.response_at(2).is_none());
    }
}
