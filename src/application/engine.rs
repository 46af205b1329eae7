//! Conversation progression engine.
//!
//! Advances a conversation through its ten question slots: create posts the
//! static opening question, each submitted response either produces the next
//! generated question or, at slot ten, the closing summary. Regeneration
//! replaces the current question or the summary through the store's atomic
//! replace operations.
//!
//! Validation and state-conflict checks run before any external call or
//! mutation, so those failures have no side effects. A generation failure
//! mid-operation leaves the conversation in one of two designed recoverable
//! states: created-but-empty at slot 0, or response-recorded-not-completed
//! at slot ten.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::LimitsConfig;
use crate::domain::validation::{validate_response, validate_title, ValidationError};
use crate::domain::{
    Conversation, ConversationId, ConversationWithMessages, Message, MessageKind, UserId,
    QUESTION_COUNT,
};
use crate::ports::{
    ConversationStore, GenerationError, PermissionChecker, PermissionError, QuestionGenerator,
    StoreError, REGENERATE_PERMISSION,
};

/// Failures surfaced by engine operations.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Rejected input; the message names the violated bound.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Conversation absent or owned by someone else. The two cases are
    /// indistinguishable on purpose.
    #[error("conversation not found")]
    NotFound,

    /// The conversation is already completed.
    #[error("conversation already completed")]
    AlreadyCompleted,

    /// Summary operations require a completed conversation.
    #[error("conversation is not completed")]
    NotCompleted,

    /// The conversation has no posted question yet (still at slot 0).
    #[error("conversation has no active question")]
    NoActiveQuestion,

    /// The current question already has a response; regeneration is only
    /// valid for an unanswered question.
    #[error("current question is already answered")]
    AlreadyAnswered,

    /// Caller lacks the regeneration permission.
    #[error("permission denied")]
    Forbidden,

    /// Text generation failed. The cause is logged server-side; callers see
    /// a generic failure.
    #[error("generation failed: {0}")]
    Generation(GenerationError),

    /// Persistence failed. Multi-step sequences have already rolled back.
    #[error("storage failed: {0}")]
    Storage(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => EngineError::NotFound,
            StoreError::Database(message) => EngineError::Storage(message),
        }
    }
}

impl From<GenerationError> for EngineError {
    fn from(err: GenerationError) -> Self {
        EngineError::Generation(err)
    }
}

impl From<PermissionError> for EngineError {
    fn from(err: PermissionError) -> Self {
        EngineError::Storage(err.to_string())
    }
}

/// Result of creating a conversation.
#[derive(Debug, Clone)]
pub struct CreatedConversation {
    pub conversation: Conversation,
    pub first_question: Message,
}

/// Result of submitting a response.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub saved_response: Message,
    /// Present while the interview is still in progress.
    pub next_question: Option<Message>,
    /// Present exactly when `is_complete` is true.
    pub summary: Option<String>,
    pub is_complete: bool,
}

/// The progression engine: one instance per process, collaborators injected
/// at startup.
pub struct ConversationEngine {
    store: Arc<dyn ConversationStore>,
    generator: Arc<dyn QuestionGenerator>,
    permissions: Arc<dyn PermissionChecker>,
    limits: LimitsConfig,
}

impl ConversationEngine {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        generator: Arc<dyn QuestionGenerator>,
        permissions: Arc<dyn PermissionChecker>,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            store,
            generator,
            permissions,
            limits,
        }
    }

    /// Creates a conversation and posts its opening question.
    ///
    /// Question 1 is the catalog's static fast path. If persisting the
    /// question fails after the conversation row exists, the conversation
    /// stays at slot 0 with no messages; that state is visible to callers
    /// and recoverable, not silently repaired here.
    pub async fn create(
        &self,
        user_id: UserId,
        title: &str,
    ) -> Result<CreatedConversation, EngineError> {
        let title = validate_title(title, self.limits.max_title_length)?;

        let mut conversation = self.store.create_conversation(user_id, &title).await?;
        info!(conversation_id = %conversation.id, "conversation created");

        let question_text = self
            .generator
            .generate_question(&[], 1)
            .await
            .map_err(|err| {
                warn!(
                    conversation_id = %conversation.id,
                    operation = "create",
                    question_number = 1u8,
                    error = %err,
                    "first question failed; conversation left at slot 0"
                );
                err
            })?;

        let first_question = self
            .store
            .save_message(
                conversation.id,
                MessageKind::Question { number: 1 },
                &question_text,
            )
            .await?;
        self.store.update_progress(conversation.id, 1, false).await?;
        conversation.current_question_number = 1;

        Ok(CreatedConversation {
            conversation,
            first_question,
        })
    }

    /// Records a response at the current slot, then either advances to the
    /// next question or, at the final slot, completes the interview with a
    /// summary.
    pub async fn submit_response(
        &self,
        user_id: UserId,
        conversation_id: ConversationId,
        text: &str,
    ) -> Result<SubmissionOutcome, EngineError> {
        let text = validate_response(text, self.limits.max_response_length)?;

        let with = self.store.get_conversation(user_id, conversation_id).await?;
        if with.conversation.completed {
            return Err(EngineError::AlreadyCompleted);
        }
        let current = with.conversation.current_question_number;
        if current == 0 {
            // Creation failed partway; the conversation still needs its
            // first question before it can take answers.
            return Err(EngineError::NoActiveQuestion);
        }

        let saved_response = self
            .store
            .save_message(
                conversation_id,
                MessageKind::Response { number: current },
                &text,
            )
            .await?;

        if current >= QUESTION_COUNT {
            return self.complete(conversation_id, saved_response).await;
        }

        let next_number = current + 1;
        let history = self.store.get_messages(conversation_id).await?;
        let question_text = self
            .generator
            .generate_question(&history, next_number)
            .await
            .map_err(|err| {
                warn!(
                    conversation_id = %conversation_id,
                    operation = "submit_response",
                    question_number = next_number,
                    error = %err,
                    "next question failed; response recorded, progress unchanged"
                );
                err
            })?;

        let next_question = self
            .store
            .save_message(
                conversation_id,
                MessageKind::Question {
                    number: next_number,
                },
                &question_text,
            )
            .await?;
        self.store
            .update_progress(conversation_id, next_number, false)
            .await?;

        Ok(SubmissionOutcome {
            saved_response,
            next_question: Some(next_question),
            summary: None,
            is_complete: false,
        })
    }

    /// Final-slot completion: summary generation plus the atomic summary
    /// write. A failure here leaves the response recorded and the
    /// conversation not completed, recoverable via regenerate-summary.
    async fn complete(
        &self,
        conversation_id: ConversationId,
        saved_response: Message,
    ) -> Result<SubmissionOutcome, EngineError> {
        let history = self.store.get_messages(conversation_id).await?;
        let summary = self
            .generator
            .generate_summary(&history)
            .await
            .map_err(|err| {
                warn!(
                    conversation_id = %conversation_id,
                    operation = "submit_response",
                    question_number = QUESTION_COUNT,
                    error = %err,
                    "summary failed; response recorded, conversation not completed"
                );
                err
            })?;

        self.store.replace_summary(conversation_id, &summary).await?;
        info!(conversation_id = %conversation_id, "conversation completed");

        Ok(SubmissionOutcome {
            saved_response,
            next_question: None,
            summary: Some(summary),
            is_complete: true,
        })
    }

    /// Replaces the current, as-yet-unanswered question with a freshly
    /// generated one at the same slot. Requires the regeneration permission.
    pub async fn regenerate_question(
        &self,
        user_id: UserId,
        conversation_id: ConversationId,
    ) -> Result<Message, EngineError> {
        self.require_regenerate_permission(user_id).await?;

        let with = self.store.get_conversation(user_id, conversation_id).await?;
        if with.conversation.completed {
            return Err(EngineError::AlreadyCompleted);
        }
        let current = with.conversation.current_question_number;
        if current == 0 {
            return Err(EngineError::NoActiveQuestion);
        }
        if with.response_at(current).is_some() {
            return Err(EngineError::AlreadyAnswered);
        }

        // The slot being replaced contributes nothing to its own
        // replacement's prompt.
        let history = with.history_excluding_slot(current);
        let question_text = self
            .generator
            .generate_question(&history, current)
            .await
            .map_err(|err| {
                warn!(
                    conversation_id = %conversation_id,
                    operation = "regenerate_question",
                    question_number = current,
                    error = %err,
                    "question regeneration failed; original question untouched"
                );
                err
            })?;

        let message = self
            .store
            .replace_question(conversation_id, current, &question_text)
            .await?;
        self.store
            .update_progress(conversation_id, current, false)
            .await?;

        Ok(message)
    }

    /// Replaces a completed conversation's summary with a freshly generated
    /// one. Requires the regeneration permission.
    pub async fn regenerate_summary(
        &self,
        user_id: UserId,
        conversation_id: ConversationId,
    ) -> Result<String, EngineError> {
        self.require_regenerate_permission(user_id).await?;

        let with = self.store.get_conversation(user_id, conversation_id).await?;
        if !with.conversation.completed {
            return Err(EngineError::NotCompleted);
        }

        let history = self.store.get_messages(conversation_id).await?;
        let summary = self
            .generator
            .generate_summary(&history)
            .await
            .map_err(|err| {
                warn!(
                    conversation_id = %conversation_id,
                    operation = "regenerate_summary",
                    error = %err,
                    "summary regeneration failed; existing summary untouched"
                );
                err
            })?;

        self.store.replace_summary(conversation_id, &summary).await?;
        Ok(summary)
    }

    /// The caller's conversations, newest first.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Conversation>, EngineError> {
        Ok(self.store.list_conversations(user_id).await?)
    }

    /// One conversation with its full history.
    pub async fn get(
        &self,
        user_id: UserId,
        conversation_id: ConversationId,
    ) -> Result<ConversationWithMessages, EngineError> {
        Ok(self.store.get_conversation(user_id, conversation_id).await?)
    }

    /// Deletes a conversation and its messages.
    pub async fn delete(
        &self,
        user_id: UserId,
        conversation_id: ConversationId,
    ) -> Result<(), EngineError> {
        if self.store.delete_conversation(user_id, conversation_id).await? {
            Ok(())
        } else {
            Err(EngineError::NotFound)
        }
    }

    async fn require_regenerate_permission(&self, user_id: UserId) -> Result<(), EngineError> {
        if self
            .permissions
            .has_permission(user_id, REGENERATE_PERMISSION)
            .await?
        {
            Ok(())
        } else {
            Err(EngineError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockGenerator;
    use crate::adapters::permissions::StaticPermissionChecker;
    use crate::adapters::sqlite::SqliteConversationStore;
    use crate::domain::MAX_TITLE_LENGTH;

    struct Harness {
        engine: ConversationEngine,
        store: Arc<SqliteConversationStore>,
        generator: Arc<MockGenerator>,
        user: UserId,
    }

    async fn harness() -> Harness {
        harness_with_permissions(StaticPermissionChecker::allow_all()).await
    }

    async fn harness_with_permissions(permissions: StaticPermissionChecker) -> Harness {
        let store = Arc::new(SqliteConversationStore::in_memory().await.unwrap());
        let generator = Arc::new(MockGenerator::new());
        let engine = ConversationEngine::new(
            store.clone(),
            generator.clone(),
            Arc::new(permissions),
            LimitsConfig::default(),
        );
        Harness {
            engine,
            store,
            generator,
            user: UserId::new(),
        }
    }

    /// Walks a fresh conversation to the given slot by answering each
    /// question.
    async fn advance_to(h: &Harness, slot: u8) -> ConversationId {
        let created = h.engine.create(h.user, "Career thoughts").await.unwrap();
        let id = created.conversation.id;
        for _ in 1..slot {
            h.engine.submit_response(h.user, id, "an answer").await.unwrap();
        }
        id
    }

    #[tokio::test]
    async fn create_posts_static_first_question_without_external_call() {
        let h = harness().await;
        let created = h.engine.create(h.user, "Career thoughts").await.unwrap();

        assert_eq!(created.conversation.current_question_number, 1);
        assert_eq!(
            created.first_question.content,
            "What brings you to explore this topic right now?"
        );
        assert_eq!(created.first_question.kind, MessageKind::Question { number: 1 });
        assert_eq!(h.generator.external_calls(), 0);

        let stored = h.engine.get(h.user, created.conversation.id).await.unwrap();
        assert_eq!(stored.messages.len(), 1);
        assert_eq!(stored.conversation.current_question_number, 1);
    }

    #[tokio::test]
    async fn create_title_boundary_law() {
        let h = harness().await;
        let at_limit = "x".repeat(MAX_TITLE_LENGTH);
        assert!(h.engine.create(h.user, &at_limit).await.is_ok());

        let over = "x".repeat(MAX_TITLE_LENGTH + 1);
        let err = h.engine.create(h.user, &over).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(err.to_string().contains(&MAX_TITLE_LENGTH.to_string()));

        let err = h.engine.create(h.user, "   ").await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn submit_advances_to_next_generated_question() {
        let h = harness().await;
        let id = advance_to(&h, 1).await;
        h.generator
            .push_question(Ok("What feels unresolved?".to_string()));

        let outcome = h.engine.submit_response(h.user, id, "I feel stuck").await.unwrap();

        assert!(!outcome.is_complete);
        assert!(outcome.summary.is_none());
        let next = outcome.next_question.unwrap();
        assert_eq!(next.kind, MessageKind::Question { number: 2 });
        assert_eq!(next.content, "What feels unresolved?");

        let stored = h.engine.get(h.user, id).await.unwrap();
        assert_eq!(stored.conversation.current_question_number, 2);
        assert!(!stored.conversation.completed);
    }

    #[tokio::test]
    async fn submit_validation_runs_before_any_write() {
        let h = harness().await;
        let id = advance_to(&h, 1).await;

        assert!(matches!(
            h.engine.submit_response(h.user, id, "  ").await,
            Err(EngineError::Validation(_))
        ));
        let over = "y".repeat(LimitsConfig::default().max_response_length + 1);
        assert!(matches!(
            h.engine.submit_response(h.user, id, &over).await,
            Err(EngineError::Validation(_))
        ));

        // No response was persisted by either rejection.
        let stored = h.engine.get(h.user, id).await.unwrap();
        assert_eq!(stored.messages.len(), 1);
    }

    #[tokio::test]
    async fn submit_to_foreign_conversation_is_not_found() {
        let h = harness().await;
        let id = advance_to(&h, 1).await;
        let stranger = UserId::new();
        assert!(matches!(
            h.engine.submit_response(stranger, id, "hello").await,
            Err(EngineError::NotFound)
        ));
    }

    #[tokio::test]
    async fn tenth_response_completes_with_summary_atomically() {
        let h = harness().await;
        let id = advance_to(&h, 10).await;
        h.generator.push_summary(Ok("A reflective journey.".to_string()));

        let outcome = h.engine.submit_response(h.user, id, "final answer").await.unwrap();

        assert!(outcome.is_complete);
        assert_eq!(outcome.summary.as_deref(), Some("A reflective journey."));
        assert!(outcome.next_question.is_none());

        // Persisted flag and summary column move together.
        let stored = h.engine.get(h.user, id).await.unwrap();
        assert!(stored.conversation.completed);
        assert_eq!(stored.conversation.summary.as_deref(), Some("A reflective journey."));
        assert_eq!(stored.conversation.current_question_number, 10);
    }

    #[tokio::test]
    async fn full_run_replays_in_interview_order() {
        let h = harness().await;
        let id = advance_to(&h, 10).await;
        h.engine.submit_response(h.user, id, "final answer").await.unwrap();

        let stored = h.engine.get(h.user, id).await.unwrap();
        let mut expected = Vec::new();
        for n in 1..=QUESTION_COUNT {
            expected.push(MessageKind::Question { number: n });
            expected.push(MessageKind::Response { number: n });
        }
        expected.push(MessageKind::Summary);
        let actual: Vec<_> = stored.messages.iter().map(|m| m.kind).collect();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn summary_failure_leaves_response_recorded_not_completed() {
        let h = harness().await;
        let id = advance_to(&h, 10).await;
        h.generator.push_summary(Err(GenerationError::GenerationFailed));

        let err = h.engine.submit_response(h.user, id, "final answer").await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Generation(GenerationError::GenerationFailed)
        ));

        let stored = h.engine.get(h.user, id).await.unwrap();
        assert!(!stored.conversation.completed);
        assert!(stored.conversation.summary.is_none());
        assert!(stored.response_at(10).is_some());
    }

    #[tokio::test]
    async fn submit_on_completed_conversation_is_rejected() {
        let h = harness().await;
        let id = advance_to(&h, 10).await;
        h.engine.submit_response(h.user, id, "final answer").await.unwrap();

        assert!(matches!(
            h.engine.submit_response(h.user, id, "one more").await,
            Err(EngineError::AlreadyCompleted)
        ));
    }

    #[tokio::test]
    async fn submit_at_slot_zero_needs_a_question_first() {
        let h = harness().await;
        // A conversation row without its first question, the documented
        // stuck-at-zero state.
        let conversation = h.store.create_conversation(h.user, "stuck").await.unwrap();
        assert!(matches!(
            h.engine.submit_response(h.user, conversation.id, "answer").await,
            Err(EngineError::NoActiveQuestion)
        ));
    }

    #[tokio::test]
    async fn regenerate_question_requires_permission() {
        let h = harness_with_permissions(StaticPermissionChecker::deny_all()).await;
        let id = advance_to(&h, 1).await;
        assert!(matches!(
            h.engine.regenerate_question(h.user, id).await,
            Err(EngineError::Forbidden)
        ));
        assert!(matches!(
            h.engine.regenerate_summary(h.user, id).await,
            Err(EngineError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn regenerate_question_replaces_unanswered_slot_in_place() {
        let h = harness().await;
        let id = advance_to(&h, 2).await;
        let before = h.engine.get(h.user, id).await.unwrap();
        let old = before.question_at(2).unwrap().clone();

        h.generator.push_question(Ok("A sharper question?".to_string()));
        let replacement = h.engine.regenerate_question(h.user, id).await.unwrap();

        assert_eq!(replacement.kind, MessageKind::Question { number: 2 });
        assert_ne!(replacement.id, old.id);
        assert_eq!(replacement.content, "A sharper question?");

        let after = h.engine.get(h.user, id).await.unwrap();
        // Same slot, exactly one question there, progress unchanged.
        assert_eq!(after.conversation.current_question_number, 2);
        let questions_at_2: Vec<_> = after
            .messages
            .iter()
            .filter(|m| m.kind == MessageKind::Question { number: 2 })
            .collect();
        assert_eq!(questions_at_2.len(), 1);
        assert_eq!(questions_at_2[0].content, "A sharper question?");
    }

    #[tokio::test]
    async fn regenerate_answered_question_is_rejected_and_untouched() {
        let h = harness().await;
        let id = advance_to(&h, 2).await;
        // Answer slot 2 directly so progress stays at 2.
        h.store
            .save_message(id, MessageKind::Response { number: 2 }, "answered")
            .await
            .unwrap();
        let before = h.engine.get(h.user, id).await.unwrap();
        let original = before.question_at(2).unwrap().clone();

        assert!(matches!(
            h.engine.regenerate_question(h.user, id).await,
            Err(EngineError::AlreadyAnswered)
        ));

        let after = h.engine.get(h.user, id).await.unwrap();
        assert_eq!(after.question_at(2), Some(&original));
    }

    #[tokio::test]
    async fn regenerate_question_at_slot_zero_is_rejected() {
        let h = harness().await;
        let conversation = h.store.create_conversation(h.user, "stuck").await.unwrap();
        assert!(matches!(
            h.engine.regenerate_question(h.user, conversation.id).await,
            Err(EngineError::NoActiveQuestion)
        ));
    }

    #[tokio::test]
    async fn regenerate_question_on_completed_conversation_is_rejected() {
        let h = harness().await;
        let id = advance_to(&h, 10).await;
        h.engine.submit_response(h.user, id, "final").await.unwrap();
        assert!(matches!(
            h.engine.regenerate_question(h.user, id).await,
            Err(EngineError::AlreadyCompleted)
        ));
    }

    #[tokio::test]
    async fn regenerate_summary_requires_completion() {
        let h = harness().await;
        let id = advance_to(&h, 3).await;
        assert!(matches!(
            h.engine.regenerate_summary(h.user, id).await,
            Err(EngineError::NotCompleted)
        ));
    }

    #[tokio::test]
    async fn regenerate_summary_leaves_exactly_one_summary_message() {
        let h = harness().await;
        let id = advance_to(&h, 10).await;
        h.engine.submit_response(h.user, id, "final").await.unwrap();

        h.generator.push_summary(Ok("A better summary.".to_string()));
        let summary = h.engine.regenerate_summary(h.user, id).await.unwrap();
        assert_eq!(summary, "A better summary.");

        let stored = h.engine.get(h.user, id).await.unwrap();
        let summaries: Vec<_> = stored
            .messages
            .iter()
            .filter(|m| m.kind.is_summary())
            .collect();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].content, "A better summary.");
        assert_eq!(stored.conversation.summary.as_deref(), Some("A better summary."));
        assert!(stored.conversation.completed);
    }

    #[tokio::test]
    async fn list_is_scoped_and_newest_first() {
        let h = harness().await;
        h.engine.create(h.user, "First").await.unwrap();
        h.engine.create(h.user, "Second").await.unwrap();
        h.engine.create(UserId::new(), "Someone else's").await.unwrap();

        let listed = h.engine.list(h.user).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].created_at >= listed[1].created_at);
        assert!(listed.iter().all(|c| c.user_id == h.user));
    }

    #[tokio::test]
    async fn delete_removes_conversation_and_messages() {
        let h = harness().await;
        let id = advance_to(&h, 2).await;
        h.engine.delete(h.user, id).await.unwrap();
        assert!(matches!(
            h.engine.get(h.user, id).await,
            Err(EngineError::NotFound)
        ));
        assert!(matches!(
            h.engine.delete(h.user, id).await,
            Err(EngineError::NotFound)
        ));
    }
}
