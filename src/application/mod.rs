//! Application layer: the conversation engine orchestrating ports.

pub mod engine;

pub use engine::{ConversationEngine, CreatedConversation, EngineError, SubmissionOutcome};
