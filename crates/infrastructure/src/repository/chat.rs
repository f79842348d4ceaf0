use application::ChatMessageRepository;
use async_trait::async_trait;
use domain::{ChatMessage, ChatMessageId, MessageRole, RepositoryError, Timestamp, UserId};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{map_sqlx_err, to_count};

#[derive(Debug, FromRow)]
struct ChatMessageRecord {
    id: Uuid,
    user_id: Uuid,
    session_id: String,
    role: MessageRole,
    content: String,
    created_at: Timestamp,
}

impl From<ChatMessageRecord> for ChatMessage {
    fn from(value: ChatMessageRecord) -> Self {
        ChatMessage {
            id: ChatMessageId::from(value.id),
            user_id: UserId::from(value.user_id),
            session_id: value.session_id,
            role: value.role,
            content: value.content,
            created_at: value.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgChatMessageRepository {
    pool: PgPool,
}

impl PgChatMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatMessageRepository for PgChatMessageRepository {
    async fn create(&self, message: ChatMessage) -> Result<ChatMessage, RepositoryError> {
        let record = sqlx::query_as::<_, ChatMessageRecord>(
            r#"
            INSERT INTO chat_messages (id, user_id, session_id, role, content, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, session_id, role, content, created_at
            "#,
        )
        .bind(message.id.0)
        .bind(message.user_id.0)
        .bind(&message.session_id)
        .bind(message.role)
        .bind(&message.content)
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.into())
    }

    async fn list_by_session(
        &self,
        user_id: UserId,
        session_id: &str,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        // 先倒序取最近 N 条，再翻回正序
        let records = sqlx::query_as::<_, ChatMessageRecord>(
            r#"
            SELECT id, user_id, session_id, role, content, created_at FROM (
                SELECT id, user_id, session_id, role, content, created_at
                FROM chat_messages
                WHERE user_id = $1 AND session_id = $2
                ORDER BY created_at DESC, id DESC
                LIMIT $3
            ) recent
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id.0)
        .bind(session_id)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(ChatMessage::from).collect())
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<ChatMessage>, RepositoryError> {
        let records = sqlx::query_as::<_, ChatMessageRecord>(
            r#"
            SELECT id, user_id, session_id, role, content, created_at
            FROM chat_messages WHERE user_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(ChatMessage::from).collect())
    }

    async fn count_by_session(
        &self,
        user_id: UserId,
        session_id: &str,
    ) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM chat_messages WHERE user_id = $1 AND session_id = $2",
        )
        .bind(user_id.0)
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(to_count(count))
    }

    async fn delete_session(
        &self,
        user_id: UserId,
        session_id: &str,
    ) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM chat_messages WHERE user_id = $1 AND session_id = $2")
                .bind(user_id.0)
                .bind(session_id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_err)?;

        Ok(result.rows_affected())
    }
}
