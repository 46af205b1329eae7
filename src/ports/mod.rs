//! Ports: trait boundaries between the engine and its collaborators.
//!
//! Adapters implement these; the application layer depends only on the
//! traits, injected as `Arc<dyn Trait>` at startup.

pub mod conversation_store;
pub mod permission_checker;
pub mod question_generator;

pub use conversation_store::{ConversationStore, StoreError};
pub use permission_checker::{PermissionChecker, PermissionError, REGENERATE_PERMISSION};
pub use question_generator::{BreakerState, GenerationError, GeneratorHealth, QuestionGenerator};
