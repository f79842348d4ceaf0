//! 对外响应结构，统一使用 camelCase 字段名。

use chrono::NaiveDate;
use domain::{
    ChatMessage, ChatMessageId, Company, CompanyId, Gender, Job, JobId, JobLevel, JobStatus,
    MessageRole, Notification, NotificationId, NotificationType, ResumeId, ResumeStatus, Role,
    RoleId, SessionMeta, Skill, Subscriber, SubscriberId, Timestamp, User, UserId,
};
use serde::Serialize;
use uuid::Uuid;

use crate::token::SessionUser;

/// 更新关联字段：保持不变、解除绑定或指向新的实体。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Assignment<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokenDto {
    pub user: SessionUser,
    pub access_token: String,
}

/// 登录 / 刷新的结果：响应体加上需要写入 Cookie 的刷新令牌。
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub body: AuthTokenDto,
    pub refresh_token: String,
    pub refresh_ttl_secs: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub session_id: String,
    pub device_name: String,
    pub device_type: String,
    pub user_agent: String,
    pub login_at: Timestamp,
    pub current: bool,
}

impl SessionDto {
    pub fn new(session_id: String, meta: SessionMeta, current: bool) -> Self {
        Self {
            session_id,
            device_name: meta.device_name,
            device_type: meta.device_type,
            user_agent: meta.user_agent,
            login_at: meta.login_at,
            current,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetailsDto {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub dob: Option<NaiveDate>,
    pub address: Option<String>,
    pub gender: Option<Gender>,
    pub logo_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&User> for UserDetailsDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.as_str().to_owned(),
            dob: user.dob,
            address: user.address.clone(),
            gender: user.gender,
            logo_url: user.logo_url.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCompanyDto {
    pub id: CompanyId,
    pub name: String,
    pub address: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRoleDto {
    pub id: RoleId,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub dob: Option<NaiveDate>,
    pub address: Option<String>,
    pub gender: Option<Gender>,
    pub logo_url: Option<String>,
    pub company: Option<UserCompanyDto>,
    pub role: Option<UserRoleDto>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserDto {
    pub fn new(user: &User, company: Option<&Company>, role: Option<&Role>) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.as_str().to_owned(),
            dob: user.dob,
            address: user.address.clone(),
            gender: user.gender,
            logo_url: user.logo_url.clone(),
            company: company.map(|c| UserCompanyDto {
                id: c.id,
                name: c.name.clone(),
                address: c.address.clone(),
                logo_url: c.logo_url.clone(),
            }),
            role: role.map(|r| UserRoleDto {
                id: r.id,
                name: r.name.clone(),
                description: r.description.clone(),
            }),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyMemberDto {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub owner: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyWithJobsDto {
    #[serde(flatten)]
    pub company: Company,
    pub jobs_count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillRefDto {
    pub id: domain::SkillId,
    pub name: String,
}

impl From<&Skill> for SkillRefDto {
    fn from(skill: &Skill) -> Self {
        Self {
            id: skill.id,
            name: skill.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCompanyDto {
    pub id: CompanyId,
    pub name: String,
    pub address: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDto {
    pub id: JobId,
    pub name: String,
    pub location: String,
    pub salary: f64,
    pub quantity: i32,
    pub level: JobLevel,
    pub description: String,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    /// 展示状态，而非存储状态
    pub status: JobStatus,
    pub company: Option<JobCompanyDto>,
    pub skills: Vec<SkillRefDto>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl JobDto {
    pub fn new(job: &Job, company: Option<&Company>, now: Timestamp) -> Self {
        Self {
            id: job.id,
            name: job.name.clone(),
            location: job.location.clone(),
            salary: job.salary,
            quantity: job.quantity,
            level: job.level,
            description: job.description.clone(),
            start_date: job.start_date,
            end_date: job.end_date,
            status: job.display_status(now),
            company: company.map(|c| JobCompanyDto {
                id: c.id,
                name: c.name.clone(),
                address: c.address.clone(),
                logo_url: c.logo_url.clone(),
            }),
            skills: job.skills.iter().map(SkillRefDto::from).collect(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelCountDto {
    pub level: JobLevel,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCountDto {
    pub status: ResumeStatus,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeUserDto {
    pub id: UserId,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeJobDto {
    pub id: JobId,
    pub name: String,
    pub location: String,
    pub skills: Vec<String>,
    pub level: JobLevel,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeCompanyDto {
    pub id: CompanyId,
    pub name: String,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeDto {
    pub id: ResumeId,
    pub status: ResumeStatus,
    pub pdf_url: String,
    pub version: i64,
    pub user: ResumeUserDto,
    pub job: Option<ResumeJobDto>,
    pub company: Option<ResumeCompanyDto>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSenderDto {
    pub id: UserId,
    pub name: String,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDto {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub is_read: bool,
    pub action_url: Option<String>,
    pub reference_id: Option<Uuid>,
    pub created_at: Timestamp,
    pub sender: Option<NotificationSenderDto>,
}

impl NotificationDto {
    pub fn new(notification: Notification, sender: Option<&User>) -> Self {
        Self {
            id: notification.id,
            title: notification.title,
            message: notification.message,
            kind: notification.kind,
            is_read: notification.is_read,
            action_url: notification.action_url,
            reference_id: notification.reference_id,
            created_at: notification.created_at,
            sender: sender.map(|user| NotificationSenderDto {
                id: user.id,
                name: user.name.clone(),
                logo_url: user.logo_url.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCreatedDto {
    pub payment_url: String,
    pub order_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusDto {
    pub paid: bool,
    /// 仅在已支付时返回
    pub applicant_count: Option<u64>,
    pub job_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAnswerDto {
    pub session_id: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageDto {
    pub id: ChatMessageId,
    pub role: MessageRole,
    pub content: String,
    pub created_at: Timestamp,
    pub created_by: String,
}

impl ChatMessageDto {
    pub fn new(message: ChatMessage, created_by: &str) -> Self {
        Self {
            id: message.id,
            role: message.role,
            content: message.content,
            created_at: message.created_at,
            created_by: created_by.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSessionDto {
    pub session_id: String,
    pub first_message: String,
    pub last_message: String,
    pub message_count: u64,
    pub created_at: Timestamp,
    pub last_message_time: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSessionInfoDto {
    pub session_id: String,
    pub exists: bool,
    pub message_count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberDto {
    pub id: SubscriberId,
    pub name: String,
    pub email: String,
    pub skills: Vec<SkillRefDto>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Subscriber> for SubscriberDto {
    fn from(subscriber: &Subscriber) -> Self {
        Self {
            id: subscriber.id,
            name: subscriber.name.clone(),
            email: subscriber.email.as_str().to_owned(),
            skills: subscriber.skills.iter().map(SkillRefDto::from).collect(),
            created_at: subscriber.created_at,
            updated_at: subscriber.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpResponseDto {
    pub success: bool,
    pub message: String,
    pub expires_in: u64,
    pub remaining_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponseDto {
    pub success: bool,
    pub message: String,
    pub is_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordResponseDto {
    pub success: bool,
    pub message: String,
}

/// 邮件批量发送统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestReport {
    pub sent: u32,
    pub failed: u32,
    pub skipped: u32,
}
