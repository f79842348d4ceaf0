use async_trait::async_trait;
use domain::{Email, JobId, JobLevel, ResumeStatus};

use crate::error::ApplicationError;

/// 推荐邮件中的一条职位
#[derive(Debug, Clone, PartialEq)]
pub struct JobDigestItem {
    pub id: JobId,
    pub name: String,
    pub company_name: Option<String>,
    pub location: String,
    pub salary: f64,
    pub level: JobLevel,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResumeStatusMail {
    pub to: Email,
    pub applicant_name: String,
    pub job_name: String,
    pub company_name: Option<String>,
    pub status: ResumeStatus,
}

/// 外发邮件端口，正文由实现方渲染为 HTML。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_otp(&self, to: &Email, name: &str, otp: &str) -> Result<(), ApplicationError>;

    async fn send_job_digest(
        &self,
        to: &Email,
        name: &str,
        jobs: &[JobDigestItem],
    ) -> Result<(), ApplicationError>;

    async fn send_resume_status(&self, mail: &ResumeStatusMail) -> Result<(), ApplicationError>;
}
