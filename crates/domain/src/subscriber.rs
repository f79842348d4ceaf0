use crate::errors::DomainError;
use crate::skill::Skill;
use crate::value_objects::{Email, SubscriberId, Timestamp};

/// 职位订阅者：按技能接收每日职位推荐邮件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub name: String,
    pub email: Email,
    pub skills: Vec<Skill>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscriber {
    pub fn new(
        id: SubscriberId,
        name: impl Into<String>,
        email: Email,
        skills: Vec<Skill>,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(DomainError::invalid_argument("name", "cannot be empty"));
        }
        Ok(Self {
            id,
            name,
            email,
            skills,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update(
        &mut self,
        name: impl Into<String>,
        skills: Vec<Skill>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(DomainError::invalid_argument("name", "cannot be empty"));
        }
        self.name = name;
        self.skills = skills;
        self.updated_at = now;
        Ok(())
    }

    pub fn skill_names(&self) -> Vec<String> {
        self.skills.iter().map(|skill| skill.name.clone()).collect()
    }
}
