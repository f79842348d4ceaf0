//! 令牌签发端口
//!
//! 访问令牌与刷新令牌格式相同，仅有效期不同；具体的签名实现位于 web-api。

use domain::{CompanyId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

use crate::error::ApplicationError;

/// 令牌中携带的会话用户信息，也是 `/auth/me` 的响应体。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub company_id: Option<CompanyId>,
    pub role: Option<String>,
    pub permissions: Vec<String>,
    pub logo_url: Option<String>,
    pub updated_at: Timestamp,
}

impl SessionUser {
    pub fn has_permission(&self, authority: &str) -> bool {
        self.permissions.iter().any(|p| p == authority)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case(role))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// 解码并校验签名后的令牌内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    /// 用户邮箱
    pub subject: String,
    pub user: SessionUser,
    pub permissions: Vec<String>,
    pub expires_at: i64,
}

pub trait TokenCodec: Send + Sync {
    fn issue(&self, user: &SessionUser, kind: TokenKind) -> Result<String, ApplicationError>;
    /// 签名无效或已过期时返回 `ApplicationError::InvalidToken`
    fn verify(&self, token: &str) -> Result<VerifiedToken, ApplicationError>;
    fn ttl_secs(&self, kind: TokenKind) -> i64;
}
