//! 招聘平台核心领域模型
//!
//! 包含用户、公司、职位、投递、通知、支付、AI 对话等实体，以及相关的业务规则。

pub mod chat;
pub mod company;
pub mod errors;
pub mod job;
pub mod notification;
pub mod payment;
pub mod resume;
pub mod role;
pub mod session;
pub mod skill;
pub mod subscriber;
pub mod user;
pub mod value_objects;

// 重新导出常用类型
pub use chat::{ChatMessage, MessageRole};
pub use company::{Company, CompanyDetails};
pub use errors::{DomainError, DomainResult, RepositoryError};
pub use job::{Job, JobDetails, JobLevel, JobStatus};
pub use notification::{Notification, NotificationType};
pub use payment::{Payment, PaymentStatus};
pub use resume::{Resume, ResumeStatus};
pub use role::{Permission, Role, BUILTIN_ROLES, ROLE_ADMIN, ROLE_RECRUITER, ROLE_USER};
pub use session::{SessionKey, SessionMeta};
pub use skill::Skill;
pub use subscriber::Subscriber;
pub use user::{Gender, User, UserProfile};
pub use value_objects::*;
