//! SQLite persistence adapter.

pub mod conversation_store;

pub use conversation_store::SqliteConversationStore;
