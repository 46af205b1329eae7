//! Domain layer: pure types with no I/O.

pub mod command;
pub mod conversation;
pub mod export;
pub mod ids;
pub mod message;
pub mod validation;

pub use command::{Command, CommandCatalog};
pub use conversation::{Conversation, ConversationWithMessages};
pub use ids::{ConversationId, MessageId, UserId};
pub use message::{Message, MessageKind, QUESTION_COUNT};
pub use validation::{ValidationError, MAX_RESPONSE_LENGTH, MAX_TITLE_LENGTH};
