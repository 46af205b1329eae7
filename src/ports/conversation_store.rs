//! ConversationStore port - atomic persistence for conversations and
//! messages.
//!
//! Ownership is enforced here: any lookup scoped by user answers `NotFound`
//! for a conversation owned by someone else, so existence is never revealed
//! to a non-owner.
//!
//! Regeneration is exposed as single replace operations rather than separate
//! delete and insert calls; implementations must make each replace
//! all-or-nothing so a concurrent reader never observes a slot with no
//! message.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Conversation, ConversationId, ConversationWithMessages, Message, MessageKind, UserId};

/// Failures from the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Conversation absent, or owned by a different user.
    #[error("conversation not found")]
    NotFound,

    /// Underlying database failure. Multi-step sequences roll back entirely
    /// before this is returned.
    #[error("database error: {0}")]
    Database(String),
}

/// Port for conversation persistence.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Inserts a new conversation at question number 0 with no messages.
    async fn create_conversation(
        &self,
        user_id: UserId,
        title: &str,
    ) -> Result<Conversation, StoreError>;

    /// Fetches a conversation with its messages ordered by creation time
    /// ascending. `NotFound` covers both absence and ownership mismatch.
    async fn get_conversation(
        &self,
        user_id: UserId,
        id: ConversationId,
    ) -> Result<ConversationWithMessages, StoreError>;

    /// Lists the caller's conversations, newest first.
    async fn list_conversations(&self, user_id: UserId) -> Result<Vec<Conversation>, StoreError>;

    /// Deletes a conversation and, by cascade, its messages. Returns whether
    /// anything was deleted.
    async fn delete_conversation(
        &self,
        user_id: UserId,
        id: ConversationId,
    ) -> Result<bool, StoreError>;

    /// Persists one message.
    async fn save_message(
        &self,
        conversation_id: ConversationId,
        kind: MessageKind,
        content: &str,
    ) -> Result<Message, StoreError>;

    /// Moves the progress counter, optionally marking completion.
    async fn update_progress(
        &self,
        conversation_id: ConversationId,
        question_number: u8,
        completed: bool,
    ) -> Result<(), StoreError>;

    /// Atomically swaps the question message at a slot: the old question for
    /// that number is deleted and the replacement inserted in one unit.
    async fn replace_question(
        &self,
        conversation_id: ConversationId,
        question_number: u8,
        content: &str,
    ) -> Result<Message, StoreError>;

    /// Atomically replaces the summary: all prior summary messages are
    /// deleted, the new one inserted, and the conversation's summary column
    /// and completed flag set, in one unit.
    async fn replace_summary(
        &self,
        conversation_id: ConversationId,
        content: &str,
    ) -> Result<Message, StoreError>;

    /// All messages for a conversation, creation time ascending.
    async fn get_messages(&self, conversation_id: ConversationId)
        -> Result<Vec<Message>, StoreError>;

    /// Cheap liveness probe against the underlying engine.
    async fn check_health(&self) -> Result<(), StoreError>;
}
