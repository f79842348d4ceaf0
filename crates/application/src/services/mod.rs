mod auth_service;
mod chat_service;
mod company_service;
mod job_service;
mod notification_service;
mod password_reset_service;
mod payment_service;
mod resume_service;
mod role_service;
mod skill_service;
mod subscriber_service;
mod user_service;
pub mod vnpay;

#[cfg(test)]
mod fixture;

#[cfg(test)]
mod auth_service_tests;
#[cfg(test)]
mod chat_service_tests;
#[cfg(test)]
mod job_service_tests;
#[cfg(test)]
mod notification_service_tests;
#[cfg(test)]
mod password_reset_service_tests;
#[cfg(test)]
mod payment_service_tests;
#[cfg(test)]
mod resume_service_tests;
#[cfg(test)]
mod skill_service_tests;

use domain::{Company, CompanyId, User, UserId};

use crate::error::ApplicationError;
use crate::repository::{CompanyRepository, UserRepository};

pub use auth_service::{
    session_user, AuthService, AuthServiceDependencies, DeviceInfo, LoginRequest,
    RegisterRequest,
};
pub use chat_service::{
    ChatService, ChatServiceDependencies, CHAT_HISTORY_DB_LIMIT, PREVIEW_MAX_CHARS,
};
pub use company_service::{CompanyService, CompanyServiceDependencies};
pub use job_service::{JobRequest, JobService, JobServiceDependencies};
pub use notification_service::{
    NotificationService, NotificationServiceDependencies, LATEST_NOTIFICATIONS,
};
pub use password_reset_service::{
    PasswordResetService, PasswordResetServiceDependencies, ResetPasswordRequest,
};
pub use payment_service::{PaymentService, PaymentServiceDependencies, PAYMENT_AMOUNT};
pub use resume_service::{ApplyRequest, ResumeService, ResumeServiceDependencies};
pub use role_service::{
    PermissionRequest, RoleRequest, RoleService, RoleServiceDependencies,
};
pub use skill_service::{SkillService, SkillServiceDependencies};
pub use subscriber_service::{
    SubscriberRequest, SubscriberService, SubscriberServiceDependencies, DIGEST_JOB_LIMIT,
};
pub use user_service::{
    CreateUserRequest, UpdateUserRequest, UserService, UserServiceDependencies,
};

/// 调用方身份：管理员可操作全部数据，招聘者只能操作本公司的职位与投递。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Admin,
    Recruiter(UserId),
}

pub(crate) async fn require_user(
    repository: &dyn UserRepository,
    id: UserId,
) -> Result<User, ApplicationError> {
    repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApplicationError::not_found("user", id))
}

pub(crate) async fn require_company(
    repository: &dyn CompanyRepository,
    id: CompanyId,
) -> Result<Company, ApplicationError> {
    repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApplicationError::not_found("company", id))
}

/// 招聘者必须已绑定公司
pub(crate) async fn recruiter_company_id(
    repository: &dyn UserRepository,
    user_id: UserId,
) -> Result<CompanyId, ApplicationError> {
    require_user(repository, user_id)
        .await?
        .company_id
        .ok_or_else(|| ApplicationError::access_denied("user is not bound to any company"))
}
