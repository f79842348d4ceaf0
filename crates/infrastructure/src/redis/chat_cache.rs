use application::chat_cache::CHAT_HISTORY_TTL;
use application::{ApplicationError, ChatHistoryCache};
use async_trait::async_trait;
use domain::{ChatMessage, UserId};
use redis::aio::ConnectionManager;
use tracing::warn;

use super::RedisError;

fn history_key(user_id: UserId, session_id: &str) -> String {
    format!("chat::history:{user_id}:{session_id}")
}

/// 对话历史缓存，整段历史以 JSON 数组保存，每次写入刷新 TTL。
#[derive(Clone)]
pub struct RedisChatHistoryCache {
    conn: ConnectionManager,
}

impl RedisChatHistoryCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl ChatHistoryCache for RedisChatHistoryCache {
    async fn load(
        &self,
        user_id: UserId,
        session_id: &str,
    ) -> Result<Option<Vec<ChatMessage>>, ApplicationError> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = redis::cmd("GET")
            .arg(history_key(user_id, session_id))
            .query_async(&mut conn)
            .await
            .map_err(RedisError::from)?;

        let Some(payload) = payload else {
            return Ok(None);
        };
        // 解析失败当作未命中，由数据库回填
        match serde_json::from_str(&payload) {
            Ok(messages) => Ok(Some(messages)),
            Err(err) => {
                warn!(%user_id, session_id, error = %err, "对话缓存损坏");
                Ok(None)
            }
        }
    }

    async fn store(
        &self,
        user_id: UserId,
        session_id: &str,
        messages: &[ChatMessage],
    ) -> Result<(), ApplicationError> {
        let payload = serde_json::to_string(messages).map_err(RedisError::from)?;
        let mut conn = self.conn.clone();
        redis::cmd("SETEX")
            .arg(history_key(user_id, session_id))
            .arg(CHAT_HISTORY_TTL.as_secs())
            .arg(payload)
            .query_async::<()>(&mut conn)
            .await
            .map_err(RedisError::from)?;
        Ok(())
    }

    async fn append(
        &self,
        user_id: UserId,
        session_id: &str,
        message: &ChatMessage,
    ) -> Result<(), ApplicationError> {
        let mut messages = self.load(user_id, session_id).await?.unwrap_or_default();
        messages.push(message.clone());
        self.store(user_id, session_id, &messages).await
    }

    async fn clear(&self, user_id: UserId, session_id: &str) -> Result<(), ApplicationError> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(history_key(user_id, session_id))
            .query_async::<()>(&mut conn)
            .await
            .map_err(RedisError::from)?;
        Ok(())
    }
}
