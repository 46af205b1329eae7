//! SQLite implementation of the ConversationStore port.
//!
//! Ids and timestamps are generated in Rust; rows store ids as text and
//! timestamps as fixed-width RFC 3339 text (nanosecond precision, so text
//! order equals creation order). The replace operations run inside explicit
//! transactions so their delete+insert sequences are all-or-nothing.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use crate::domain::{
    Conversation, ConversationId, ConversationWithMessages, Message, MessageId, MessageKind,
    UserId,
};
use crate::ports::{ConversationStore, StoreError};

/// Statements applied at startup. `IF NOT EXISTS` keeps reapplication cheap.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS conversations (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        title TEXT NOT NULL,
        summary TEXT,
        completed INTEGER NOT NULL DEFAULT 0,
        current_question_number INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        conversation_id TEXT NOT NULL
            REFERENCES conversations(id) ON DELETE CASCADE,
        type TEXT NOT NULL,
        content TEXT NOT NULL,
        question_number INTEGER,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_messages_conversation
        ON messages(conversation_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_conversations_user
        ON conversations(user_id, created_at)",
];

/// SQLite-backed conversation store.
#[derive(Clone)]
pub struct SqliteConversationStore {
    pool: SqlitePool,
}

impl SqliteConversationStore {
    /// Wraps an existing pool. The schema must already be applied.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) a database file, enables foreign keys, and
    /// applies the schema.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_err)?;
        let store = Self::new(pool);
        store.apply_schema().await?;
        Ok(store)
    }

    /// In-memory database for tests. A single connection keeps every query
    /// on the same memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(db_err)?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(db_err)?;
        let store = Self::new(pool);
        store.apply_schema().await?;
        Ok(store)
    }

    /// Applies the schema statements.
    pub async fn apply_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn create_conversation(
        &self,
        user_id: UserId,
        title: &str,
    ) -> Result<Conversation, StoreError> {
        let conversation = Conversation::new(user_id, title);
        sqlx::query(
            "INSERT INTO conversations
                (id, user_id, title, summary, completed, current_question_number, created_at)
             VALUES (?, ?, ?, NULL, 0, 0, ?)",
        )
        .bind(conversation.id.to_string())
        .bind(conversation.user_id.to_string())
        .bind(&conversation.title)
        .bind(conversation.created_at.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(conversation)
    }

    async fn get_conversation(
        &self,
        user_id: UserId,
        id: ConversationId,
    ) -> Result<ConversationWithMessages, StoreError> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = ? AND user_id = ?")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(StoreError::NotFound)?;

        let conversation = map_conversation(&row)?;
        let messages = self.get_messages(id).await?;
        Ok(ConversationWithMessages {
            conversation,
            messages,
        })
    }

    async fn list_conversations(&self, user_id: UserId) -> Result<Vec<Conversation>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM conversations WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(map_conversation).collect()
    }

    async fn delete_conversation(
        &self,
        user_id: UserId,
        id: ConversationId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = ? AND user_id = ?")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn save_message(
        &self,
        conversation_id: ConversationId,
        kind: MessageKind,
        content: &str,
    ) -> Result<Message, StoreError> {
        let message = Message::new(conversation_id, kind, content);
        insert_message(&self.pool, &message).await?;
        Ok(message)
    }

    async fn update_progress(
        &self,
        conversation_id: ConversationId,
        question_number: u8,
        completed: bool,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE conversations SET current_question_number = ?, completed = ? WHERE id = ?",
        )
        .bind(i64::from(question_number))
        .bind(completed)
        .bind(conversation_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn replace_question(
        &self,
        conversation_id: ConversationId,
        question_number: u8,
        content: &str,
    ) -> Result<Message, StoreError> {
        let message = Message::new(
            conversation_id,
            MessageKind::Question {
                number: question_number,
            },
            content,
        );

        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query(
            "DELETE FROM messages
             WHERE conversation_id = ? AND type = 'question' AND question_number = ?",
        )
        .bind(conversation_id.to_string())
        .bind(i64::from(question_number))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        insert_message_tx(&mut tx, &message).await?;
        tx.commit().await.map_err(db_err)?;

        Ok(message)
    }

    async fn replace_summary(
        &self,
        conversation_id: ConversationId,
        content: &str,
    ) -> Result<Message, StoreError> {
        let message = Message::new(conversation_id, MessageKind::Summary, content);

        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query("DELETE FROM messages WHERE conversation_id = ? AND type = 'summary'")
            .bind(conversation_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        insert_message_tx(&mut tx, &message).await?;
        let result = sqlx::query(
            "UPDATE conversations SET summary = ?, completed = 1 WHERE id = ?",
        )
        .bind(content)
        .bind(conversation_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            // Roll the whole replace back rather than leave an orphan
            // summary message.
            return Err(StoreError::NotFound);
        }
        tx.commit().await.map_err(db_err)?;

        Ok(message)
    }

    async fn get_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY created_at ASC",
        )
        .bind(conversation_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(map_message).collect()
    }

    async fn check_health(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

async fn insert_message(pool: &SqlitePool, message: &Message) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO messages (id, conversation_id, type, content, question_number, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(message.id.to_string())
    .bind(message.conversation_id.to_string())
    .bind(message.kind.type_str())
    .bind(&message.content)
    .bind(message.kind.question_number().map(i64::from))
    .bind(message.created_at.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true))
    .execute(pool)
    .await
    .map_err(db_err)?;
    Ok(())
}

async fn insert_message_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    message: &Message,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO messages (id, conversation_id, type, content, question_number, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(message.id.to_string())
    .bind(message.conversation_id.to_string())
    .bind(message.kind.type_str())
    .bind(&message.content)
    .bind(message.kind.question_number().map(i64::from))
    .bind(message.created_at.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true))
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;
    Ok(())
}

fn map_conversation(row: &SqliteRow) -> Result<Conversation, StoreError> {
    Ok(Conversation {
        id: parse_id::<ConversationId>(row.try_get::<String, _>("id").map_err(db_err)?)?,
        user_id: parse_id::<UserId>(row.try_get::<String, _>("user_id").map_err(db_err)?)?,
        title: row.try_get("title").map_err(db_err)?,
        summary: row.try_get("summary").map_err(db_err)?,
        completed: row.try_get("completed").map_err(db_err)?,
        current_question_number: row
            .try_get::<i64, _>("current_question_number")
            .map_err(db_err)? as u8,
        created_at: parse_timestamp(row.try_get::<String, _>("created_at").map_err(db_err)?)?,
    })
}

fn map_message(row: &SqliteRow) -> Result<Message, StoreError> {
    let type_str: String = row.try_get("type").map_err(db_err)?;
    let question_number: Option<i64> = row.try_get("question_number").map_err(db_err)?;
    let kind = MessageKind::from_parts(&type_str, question_number.map(|n| n as u8))
        .ok_or_else(|| {
            StoreError::Database(format!("corrupt message row: type={type_str}"))
        })?;
    Ok(Message {
        id: parse_id::<MessageId>(row.try_get::<String, _>("id").map_err(db_err)?)?,
        conversation_id: parse_id::<ConversationId>(
            row.try_get::<String, _>("conversation_id").map_err(db_err)?,
        )?,
        kind,
        content: row.try_get("content").map_err(db_err)?,
        created_at: parse_timestamp(row.try_get::<String, _>("created_at").map_err(db_err)?)?,
    })
}

fn parse_id<T: FromStr>(raw: String) -> Result<T, StoreError>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| StoreError::Database(format!("corrupt id '{raw}': {e}")))
}

fn parse_timestamp(raw: String) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Database(format!("corrupt timestamp '{raw}': {e}")))
}

fn db_err(err: impl std::fmt::Display) -> StoreError {
    StoreError::Database(err.to_string())
}
