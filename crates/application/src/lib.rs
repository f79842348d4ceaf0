//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务，处理权限范围、输入校验，
//! 以及对外部适配器（数据库、Redis、邮件、大模型、文件存储）的抽象。
//! `memory` 模块给出全部端口的内存实现，供测试与本地调试使用。

pub mod chat_cache;
pub mod clock;
pub mod dto;
pub mod error;
pub mod llm;
pub mod mailer;
pub mod memory;
pub mod otp;
pub mod password;
pub mod repository;
pub mod services;
pub mod session_store;
pub mod storage;
pub mod token;

pub use chat_cache::ChatHistoryCache;
pub use clock::{Clock, SystemClock};
pub use error::ApplicationError;
pub use llm::LlmClient;
pub use mailer::{JobDigestItem, Mailer, ResumeStatusMail};
pub use otp::OtpStore;
pub use password::{PasswordHasher, PasswordHasherError};
pub use repository::{
    ChatMessageRepository, CompanyRepository, JobFilter, JobRepository, NotificationRepository,
    PaymentRepository, PermissionRepository, ResumeRepository, RoleRepository, SkillRepository,
    SubscriberRepository, UserFilter, UserRepository,
};
pub use services::*;
pub use session_store::RefreshTokenStore;
pub use storage::FileStorage;
pub use token::{SessionUser, TokenCodec, TokenKind, VerifiedToken};
