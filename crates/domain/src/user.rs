use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{CompanyId, Email, PasswordHash, RoleId, Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "gender", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub password: PasswordHash, // 不直接暴露给客户端
    pub dob: Option<NaiveDate>,
    pub address: Option<String>,
    pub gender: Option<Gender>,
    pub logo_url: Option<String>,
    pub company_id: Option<CompanyId>,
    pub role_id: Option<RoleId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// 个人资料字段，注册、管理员编辑、自助编辑共用。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub address: Option<String>,
    pub gender: Option<Gender>,
}

impl User {
    pub fn register(
        id: UserId,
        profile: UserProfile,
        email: Email,
        password: PasswordHash,
        role_id: Option<RoleId>,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        let name = normalize_name(profile.name)?;
        Ok(Self {
            id,
            name,
            email,
            password,
            dob: profile.dob,
            address: profile.address,
            gender: profile.gender,
            logo_url: None,
            company_id: None,
            role_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_profile(&mut self, profile: UserProfile, now: Timestamp) -> Result<(), DomainError> {
        self.name = normalize_name(profile.name)?;
        self.dob = profile.dob;
        self.address = profile.address;
        self.gender = profile.gender;
        self.updated_at = now;
        Ok(())
    }

    pub fn set_password(&mut self, password: PasswordHash, now: Timestamp) {
        self.password = password;
        self.updated_at = now;
    }

    pub fn set_logo(&mut self, logo_url: impl Into<String>, now: Timestamp) {
        self.logo_url = Some(logo_url.into());
        self.updated_at = now;
    }

    pub fn assign_company(&mut self, company_id: Option<CompanyId>, now: Timestamp) {
        self.company_id = company_id;
        self.updated_at = now;
    }

    pub fn assign_role(&mut self, role_id: Option<RoleId>, now: Timestamp) {
        self.role_id = role_id;
        self.updated_at = now;
    }
}

fn normalize_name(name: String) -> Result<String, DomainError> {
    let name = name.trim().to_owned();
    if name.is_empty() {
        return Err(DomainError::invalid_argument("name", "cannot be empty"));
    }
    if name.chars().count() > 100 {
        return Err(DomainError::invalid_argument("name", "too long"));
    }
    Ok(name)
}
