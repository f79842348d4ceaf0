//! 刷新令牌会话存储
//!
//! 每个会话一个键 `auth:refresh_token:{token}:{userId}`，值为设备信息 JSON，
//! 过期时间与刷新令牌一致。

use application::{ApplicationError, RefreshTokenStore};
use async_trait::async_trait;
use domain::{SessionKey, SessionMeta, UserId};
use redis::aio::ConnectionManager;
use tracing::warn;

use super::RedisError;

/// SCAN 每批返回的建议数量
const SCAN_BATCH: usize = 100;

#[derive(Clone)]
pub struct RedisRefreshTokenStore {
    conn: ConnectionManager,
}

impl RedisRefreshTokenStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, RedisError> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys)
    }
}

#[async_trait]
impl RefreshTokenStore for RedisRefreshTokenStore {
    async fn save(
        &self,
        key: &SessionKey,
        meta: &SessionMeta,
        ttl_secs: u64,
    ) -> Result<(), ApplicationError> {
        let payload = serde_json::to_string(meta).map_err(RedisError::from)?;
        let mut conn = self.conn.clone();
        redis::cmd("SETEX")
            .arg(key.as_str())
            .arg(ttl_secs.max(1))
            .arg(payload)
            .query_async::<()>(&mut conn)
            .await
            .map_err(RedisError::from)?;
        Ok(())
    }

    async fn exists(&self, key: &SessionKey) -> Result<bool, ApplicationError> {
        let mut conn = self.conn.clone();
        let count: u32 = redis::cmd("EXISTS")
            .arg(key.as_str())
            .query_async(&mut conn)
            .await
            .map_err(RedisError::from)?;
        Ok(count > 0)
    }

    async fn delete(&self, key: &SessionKey) -> Result<(), ApplicationError> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(key.as_str())
            .query_async::<()>(&mut conn)
            .await
            .map_err(RedisError::from)?;
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<(SessionKey, SessionMeta)>, ApplicationError> {
        let keys = self.scan(&SessionKey::pattern_for(user_id)).await?;
        let mut conn = self.conn.clone();
        let mut sessions = Vec::with_capacity(keys.len());
        for raw in keys {
            // 扫描与读取之间键可能已过期
            let payload: Option<String> = redis::cmd("GET")
                .arg(&raw)
                .query_async(&mut conn)
                .await
                .map_err(RedisError::from)?;
            let Some(payload) = payload else {
                continue;
            };
            match serde_json::from_str::<SessionMeta>(&payload) {
                Ok(meta) => sessions.push((SessionKey::from_raw(raw), meta)),
                Err(err) => warn!(key = %raw, error = %err, "跳过无法解析的会话"),
            }
        }
        Ok(sessions)
    }
}
