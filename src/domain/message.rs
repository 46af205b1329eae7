//! Message types for the guided interview.
//!
//! A message is one turn of the interview: a generated question, the user's
//! response, or the closing summary. The kind is a tagged union so a summary
//! cannot carry a question number by accident.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ConversationId, MessageId};

/// Total number of question slots in an interview.
pub const QUESTION_COUNT: u8 = 10;

/// What a message is, and where it sits in the interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageKind {
    /// A question posed to the user at a 1-based slot.
    Question {
        #[serde(rename = "questionNumber")]
        number: u8,
    },
    /// The user's answer to the question at the same slot.
    Response {
        #[serde(rename = "questionNumber")]
        number: u8,
    },
    /// The closing narrative, present only once the interview is complete.
    Summary,
}

impl MessageKind {
    /// The question slot this message belongs to, if any.
    pub fn question_number(&self) -> Option<u8> {
        match self {
            MessageKind::Question { number } | MessageKind::Response { number } => Some(*number),
            MessageKind::Summary => None,
        }
    }

    /// Storage discriminant, matching the `type` column.
    pub fn type_str(&self) -> &'static str {
        match self {
            MessageKind::Question { .. } => "question",
            MessageKind::Response { .. } => "response",
            MessageKind::Summary => "summary",
        }
    }

    /// Rebuilds a kind from its storage representation.
    ///
    /// Returns `None` for an unknown discriminant or a question/response row
    /// missing its slot number.
    pub fn from_parts(type_str: &str, question_number: Option<u8>) -> Option<Self> {
        match type_str {
            "question" => question_number.map(|number| MessageKind::Question { number }),
            "response" => question_number.map(|number| MessageKind::Response { number }),
            "summary" => Some(MessageKind::Summary),
            _ => None,
        }
    }

    pub fn is_question(&self) -> bool {
        matches!(self, MessageKind::Question { .. })
    }

    pub fn is_response(&self) -> bool {
        matches!(self, MessageKind::Response { .. })
    }

    pub fn is_summary(&self) -> bool {
        matches!(self, MessageKind::Summary)
    }
}

/// One persisted turn of a conversation. Content is immutable once written;
/// regeneration replaces the whole message rather than editing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    #[serde(flatten)]
    pub kind: MessageKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Creates a new message stamped with the current time.
    pub fn new(conversation_id: ConversationId, kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            kind,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}
