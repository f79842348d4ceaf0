use std::time::Duration;

use async_trait::async_trait;
use domain::{ChatMessage, UserId};

use crate::error::ApplicationError;

/// 对话历史缓存有效期
pub const CHAT_HISTORY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// 对话历史缓存，键为 `chat::history:{userId}:{sessionId}`。
#[async_trait]
pub trait ChatHistoryCache: Send + Sync {
    /// 未命中返回 `None`
    async fn load(
        &self,
        user_id: UserId,
        session_id: &str,
    ) -> Result<Option<Vec<ChatMessage>>, ApplicationError>;

    async fn store(
        &self,
        user_id: UserId,
        session_id: &str,
        messages: &[ChatMessage],
    ) -> Result<(), ApplicationError>;

    async fn append(
        &self,
        user_id: UserId,
        session_id: &str,
        message: &ChatMessage,
    ) -> Result<(), ApplicationError>;

    async fn clear(&self, user_id: UserId, session_id: &str) -> Result<(), ApplicationError>;
}
