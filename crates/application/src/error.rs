use domain::{DomainError, RepositoryError};
use thiserror::Error;

use crate::password::PasswordHasherError;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(RepositoryError),
    #[error("password error: {0}")]
    Password(#[from] PasswordHasherError),
    /// 唯一性或状态冲突，但不是某个实体重复（例如旧密码错误）
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
    /// 邮箱或密码错误
    #[error("authentication failed")]
    Authentication,
    /// 令牌无法解码、已过期或已被吊销
    #[error("invalid token")]
    InvalidToken,
}

impl ApplicationError {
    /// 创建基础设施错误
    pub fn infrastructure(message: impl Into<String>) -> Self {
        ApplicationError::Infrastructure(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApplicationError::Conflict(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ApplicationError::Domain(DomainError::not_found(entity, id))
    }

    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ApplicationError::Domain(DomainError::invalid_argument(field, reason))
    }

    pub fn business_rule(reason: impl Into<String>) -> Self {
        ApplicationError::Domain(DomainError::business_rule(reason))
    }

    pub fn access_denied(reason: impl Into<String>) -> Self {
        ApplicationError::Domain(DomainError::access_denied(reason))
    }

    pub fn already_exists(entity: &'static str, key: impl Into<String>) -> Self {
        ApplicationError::Domain(DomainError::already_exists(entity, key))
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Repository(value)
    }
}
