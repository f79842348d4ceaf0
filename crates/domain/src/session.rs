use serde::{Deserialize, Serialize};

use crate::value_objects::{Timestamp, UserId};

const SESSION_KEY_PREFIX: &str = "auth:refresh_token";

/// 登录设备信息，随刷新令牌一起保存。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    pub device_name: String,
    pub device_type: String,
    pub user_agent: String,
    pub login_at: Timestamp,
}

/// 会话键：`auth:refresh_token:{token}:{userId}`，按冒号切分后下标 3 为用户 ID。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(refresh_token: &str, user_id: UserId) -> Self {
        Self(format!("{SESSION_KEY_PREFIX}:{refresh_token}:{user_id}"))
    }

    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// 匹配某用户全部会话的 Redis 模式。
    pub fn pattern_for(user_id: UserId) -> String {
        format!("{SESSION_KEY_PREFIX}:*:{user_id}")
    }

    pub fn owner(&self) -> Option<&str> {
        self.0.split(':').nth(3)
    }

    pub fn token(&self) -> Option<&str> {
        self.0.split(':').nth(2)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_is_fourth_segment() {
        let user_id = UserId::generate();
        let key = SessionKey::new("aaa.bbb.ccc", user_id);
        assert_eq!(key.owner(), Some(user_id.to_string().as_str()));
        assert_eq!(key.token(), Some("aaa.bbb.ccc"));
    }

    #[test]
    fn malformed_key_has_no_owner() {
        assert_eq!(SessionKey::from_raw("auth:refresh_token").owner(), None);
    }
}
