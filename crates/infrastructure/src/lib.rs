//! 基础设施层实现。
//!
//! 提供 PostgreSQL 仓储、Redis 存储、bcrypt 密码哈希、SMTP 邮件、大模型客户端、
//! 本地文件存储与定时任务，实现应用层定义的端口。

pub mod builder;
pub mod llm;
pub mod mailer;
pub mod migrations;
pub mod password;
pub mod redis;
pub mod repository;
pub mod scheduler;
pub mod storage;

pub use builder::{Infrastructure, InfrastructureError};
pub use llm::OpenAiClient;
pub use mailer::{MailerError, SmtpMailer};
pub use migrations::MIGRATOR;
pub use password::BcryptPasswordHasher;
pub use self::redis::{RedisChatHistoryCache, RedisOtpStore, RedisRefreshTokenStore};
pub use repository::{
    create_pg_pool, PgChatMessageRepository, PgCompanyRepository, PgJobRepository,
    PgNotificationRepository, PgPaymentRepository, PgPermissionRepository, PgResumeRepository,
    PgRoleRepository, PgSkillRepository, PgStorage, PgSubscriberRepository, PgUserRepository,
};
pub use scheduler::start_scheduler;
pub use storage::LocalFileStorage;
