//! PostgreSQL 仓储实现。
//!
//! 每个聚合一个 `PgXxxRepository`，行记录先读入 `XxxRecord`，再转换成领域实体。
//! 多对多关系（职位技能、角色权限、订阅技能）在读取主表后批量补齐。

mod chat;
mod company;
mod job;
mod notification;
mod payment;
mod permission;
mod resume;
mod role;
mod skill;
mod subscriber;
mod user;

use std::sync::Arc;

use domain::RepositoryError;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub use chat::PgChatMessageRepository;
pub use company::PgCompanyRepository;
pub use job::PgJobRepository;
pub use notification::PgNotificationRepository;
pub use payment::PgPaymentRepository;
pub use permission::PgPermissionRepository;
pub use resume::PgResumeRepository;
pub use role::PgRoleRepository;
pub use skill::PgSkillRepository;
pub use subscriber::PgSubscriberRepository;
pub use user::PgUserRepository;

pub(crate) fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict,
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        _ => RepositoryError::storage(err.to_string()),
    }
}

pub(crate) fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

/// 模糊查询参数：空白视为不过滤
pub(crate) fn like_pattern(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| format!("%{v}%"))
}

pub(crate) fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

/// 所有仓储共享同一个连接池。
#[derive(Clone)]
pub struct PgStorage {
    pub pool: PgPool,
    pub user_repository: Arc<PgUserRepository>,
    pub role_repository: Arc<PgRoleRepository>,
    pub permission_repository: Arc<PgPermissionRepository>,
    pub company_repository: Arc<PgCompanyRepository>,
    pub skill_repository: Arc<PgSkillRepository>,
    pub job_repository: Arc<PgJobRepository>,
    pub resume_repository: Arc<PgResumeRepository>,
    pub notification_repository: Arc<PgNotificationRepository>,
    pub payment_repository: Arc<PgPaymentRepository>,
    pub chat_message_repository: Arc<PgChatMessageRepository>,
    pub subscriber_repository: Arc<PgSubscriberRepository>,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            user_repository: Arc::new(PgUserRepository::new(pool.clone())),
            role_repository: Arc::new(PgRoleRepository::new(pool.clone())),
            permission_repository: Arc::new(PgPermissionRepository::new(pool.clone())),
            company_repository: Arc::new(PgCompanyRepository::new(pool.clone())),
            skill_repository: Arc::new(PgSkillRepository::new(pool.clone())),
            job_repository: Arc::new(PgJobRepository::new(pool.clone())),
            resume_repository: Arc::new(PgResumeRepository::new(pool.clone())),
            notification_repository: Arc::new(PgNotificationRepository::new(pool.clone())),
            payment_repository: Arc::new(PgPaymentRepository::new(pool.clone())),
            chat_message_repository: Arc::new(PgChatMessageRepository::new(pool.clone())),
            subscriber_repository: Arc::new(PgSubscriberRepository::new(pool.clone())),
            pool,
        }
    }
}

pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
