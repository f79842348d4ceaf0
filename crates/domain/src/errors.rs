//! 领域模型错误定义
//!
//! 业务规则违反与仓储失败分开建模，应用层再统一映射为 HTTP 状态。

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 参数校验失败
    #[error("invalid argument {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    /// 资源不存在
    #[error("{entity} not found: {id}")]
    EntityNotFound { entity: &'static str, id: String },

    /// 资源已存在（唯一键冲突）
    #[error("{entity} already exists: {key}")]
    EntityAlreadyExists { entity: &'static str, key: String },

    /// 无权访问该资源
    #[error("access denied: {reason}")]
    AccessDenied { reason: String },

    /// 业务规则违反
    #[error("{reason}")]
    BusinessRule { reason: String },
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::EntityNotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn already_exists(entity: &'static str, key: impl Into<String>) -> Self {
        Self::EntityAlreadyExists {
            entity,
            key: key.into(),
        }
    }

    pub fn access_denied(reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            reason: reason.into(),
        }
    }

    pub fn business_rule(reason: impl Into<String>) -> Self {
        Self::BusinessRule {
            reason: reason.into(),
        }
    }
}

/// 仓储层错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("unique constraint violated")]
    Conflict,
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;
