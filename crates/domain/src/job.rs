use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::skill::Skill;
use crate::value_objects::{CompanyId, JobId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_level", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobLevel {
    Intern,
    Fresher,
    Middle,
    Senior,
    Leader,
}

impl JobLevel {
    pub const ALL: [JobLevel; 5] = [
        JobLevel::Intern,
        JobLevel::Fresher,
        JobLevel::Middle,
        JobLevel::Senior,
        JobLevel::Leader,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobLevel::Intern => "INTERN",
            JobLevel::Fresher => "FRESHER",
            JobLevel::Middle => "MIDDLE",
            JobLevel::Senior => "SENIOR",
            JobLevel::Leader => "LEADER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// 正在招聘
    Active,
    /// 已过截止日期
    Expired,
    /// 招聘方手动暂停
    Paused,
    /// 草稿，未公开
    Draft,
}

/// 创建与更新职位共用的字段。
#[derive(Debug, Clone, PartialEq)]
pub struct JobDetails {
    pub name: String,
    pub location: String,
    pub salary: f64,
    pub quantity: i32,
    pub level: JobLevel,
    pub description: String,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub status: JobStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub location: String,
    pub salary: f64,
    pub quantity: i32,
    pub level: JobLevel,
    pub description: String,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub status: JobStatus,
    pub company_id: Option<CompanyId>,
    pub skills: Vec<Skill>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    pub fn new(
        id: JobId,
        details: JobDetails,
        company_id: Option<CompanyId>,
        skills: Vec<Skill>,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        validate(&details)?;
        Ok(Self {
            id,
            name: details.name.trim().to_owned(),
            location: details.location,
            salary: details.salary,
            quantity: details.quantity,
            level: details.level,
            description: details.description,
            start_date: details.start_date,
            end_date: details.end_date,
            status: details.status,
            company_id,
            skills,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update(
        &mut self,
        details: JobDetails,
        skills: Vec<Skill>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        validate(&details)?;
        self.name = details.name.trim().to_owned();
        self.location = details.location;
        self.salary = details.salary;
        self.quantity = details.quantity;
        self.level = details.level;
        self.description = details.description;
        self.start_date = details.start_date;
        self.end_date = details.end_date;
        self.status = details.status;
        self.skills = skills;
        self.updated_at = now;
        Ok(())
    }

    /// 对外展示的状态：暂停和草稿原样返回，其余按截止日期判定。
    pub fn display_status(&self, now: Timestamp) -> JobStatus {
        match self.status {
            JobStatus::Paused | JobStatus::Draft => self.status,
            _ if self.end_date < now => JobStatus::Expired,
            _ => JobStatus::Active,
        }
    }

    pub fn accepts_applications(&self, now: Timestamp) -> Result<(), DomainError> {
        if self.end_date < now {
            return Err(DomainError::business_rule("job application deadline has passed"));
        }
        if self.status != JobStatus::Active {
            return Err(DomainError::business_rule("job is not open for applications"));
        }
        Ok(())
    }
}

fn validate(details: &JobDetails) -> Result<(), DomainError> {
    if details.name.trim().is_empty() {
        return Err(DomainError::invalid_argument("name", "cannot be empty"));
    }
    if details.salary < 0.0 {
        return Err(DomainError::invalid_argument("salary", "must not be negative"));
    }
    if details.quantity < 1 {
        return Err(DomainError::invalid_argument("quantity", "must be at least 1"));
    }
    if details.end_date < details.start_date {
        return Err(DomainError::invalid_argument(
            "endDate",
            "must not be before startDate",
        ));
    }
    Ok(())
}
