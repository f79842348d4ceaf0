use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{ChatMessageId, Timestamp, UserId};

pub const MAX_QUESTION_LEN: usize = 500;
pub const MAX_SESSION_ID_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "chat_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageRole {
    User,
    Assistant,
}

/// AI 对话消息，同时以 JSON 形式缓存在 Redis 中。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: ChatMessageId,
    pub user_id: UserId,
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: Timestamp,
}

impl ChatMessage {
    pub fn new(
        user_id: UserId,
        session_id: impl Into<String>,
        role: MessageRole,
        content: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: ChatMessageId::generate(),
            user_id,
            session_id: session_id.into(),
            role,
            content: content.into(),
            created_at: now,
        }
    }
}

pub fn validate_session_id(session_id: &str) -> Result<(), DomainError> {
    if session_id.trim().is_empty() {
        return Err(DomainError::invalid_argument("sessionId", "cannot be empty"));
    }
    if session_id.chars().count() > MAX_SESSION_ID_LEN {
        return Err(DomainError::invalid_argument(
            "sessionId",
            format!("must be at most {MAX_SESSION_ID_LEN} characters"),
        ));
    }
    Ok(())
}

pub fn validate_question(question: &str) -> Result<(), DomainError> {
    if question.trim().is_empty() {
        return Err(DomainError::invalid_argument("question", "cannot be empty"));
    }
    if question.chars().count() > MAX_QUESTION_LEN {
        return Err(DomainError::invalid_argument(
            "question",
            format!("must be at most {MAX_QUESTION_LEN} characters"),
        ));
    }
    Ok(())
}
