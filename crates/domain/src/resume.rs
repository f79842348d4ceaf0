use serde::{Deserialize, Serialize};

use crate::value_objects::{Email, JobId, ResumeId, Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "resume_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResumeStatus {
    Pending,
    Reviewing,
    Approved,
    Rejected,
}

impl ResumeStatus {
    pub const ALL: [ResumeStatus; 4] = [
        ResumeStatus::Pending,
        ResumeStatus::Reviewing,
        ResumeStatus::Approved,
        ResumeStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResumeStatus::Pending => "PENDING",
            ResumeStatus::Reviewing => "REVIEWING",
            ResumeStatus::Approved => "APPROVED",
            ResumeStatus::Rejected => "REJECTED",
        }
    }

    /// 站内通知使用的越南语状态文案。
    pub fn label_vi(&self) -> &'static str {
        match self {
            ResumeStatus::Pending => "Đang chờ xử lý",
            ResumeStatus::Reviewing => "Đang xem xét",
            ResumeStatus::Approved => "Đã được duyệt",
            ResumeStatus::Rejected => "Không phù hợp",
        }
    }
}

/// 一份投递记录：一个用户对一个职位最多一份。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resume {
    pub id: ResumeId,
    pub email: Email,
    pub file_key: String,
    pub status: ResumeStatus,
    pub user_id: UserId,
    pub job_id: JobId,
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Resume {
    pub fn submit(
        id: ResumeId,
        email: Email,
        user_id: UserId,
        job_id: JobId,
        now: Timestamp,
    ) -> Self {
        let version = 1;
        Self {
            file_key: file_key_for(&email, id, version),
            id,
            email,
            status: ResumeStatus::Pending,
            user_id,
            job_id,
            version,
            created_at: now,
            updated_at: now,
        }
    }

    /// 替换 PDF：版本号递增并返回新的存储键。
    pub fn bump_version(&mut self, now: Timestamp) -> &str {
        self.version += 1;
        self.file_key = file_key_for(&self.email, self.id, self.version);
        self.updated_at = now;
        &self.file_key
    }

    pub fn set_status(&mut self, status: ResumeStatus, now: Timestamp) {
        self.status = status;
        self.updated_at = now;
    }
}

/// `resume/{邮箱非字母数字替换为 _}/resume-{id}-{version}.pdf`
pub fn file_key_for(email: &Email, id: ResumeId, version: i64) -> String {
    let folder: String = email
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("resume/{folder}/resume-{id}-{version}.pdf")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn file_key_sanitizes_email_and_tracks_version() {
        let email = Email::parse("an.tran+cv@mail.vn").unwrap();
        let id = ResumeId::generate();
        let mut resume = Resume::submit(id, email, UserId::generate(), JobId::generate(), Utc::now());
        assert_eq!(
            resume.file_key,
            format!("resume/an_tran_cv_mail_vn/resume-{id}-1.pdf")
        );

        let key = resume.bump_version(Utc::now()).to_owned();
        assert_eq!(resume.version, 2);
        assert!(key.ends_with(&format!("resume-{id}-2.pdf")));
    }

    #[test]
    fn new_resume_is_pending() {
        let resume = Resume::submit(
            ResumeId::generate(),
            Email::parse("a@b.c").unwrap(),
            UserId::generate(),
            JobId::generate(),
            Utc::now(),
        );
        assert_eq!(resume.status, ResumeStatus::Pending);
    }
}
