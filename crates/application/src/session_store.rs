use async_trait::async_trait;
use domain::{SessionKey, SessionMeta, UserId};

use crate::error::ApplicationError;

/// 刷新令牌存储，键格式见 [`SessionKey`]。
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn save(
        &self,
        key: &SessionKey,
        meta: &SessionMeta,
        ttl_secs: u64,
    ) -> Result<(), ApplicationError>;

    async fn exists(&self, key: &SessionKey) -> Result<bool, ApplicationError>;

    async fn delete(&self, key: &SessionKey) -> Result<(), ApplicationError>;

    /// 列出某个用户的全部会话
    async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<(SessionKey, SessionMeta)>, ApplicationError>;
}
