use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{CompanyId, Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub logo_url: Option<String>,
    /// 通过招聘方自助创建时的创建者
    pub owner_id: Option<UserId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyDetails {
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
}

impl Company {
    pub fn new(
        id: CompanyId,
        details: CompanyDetails,
        owner_id: Option<UserId>,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        let mut company = Self {
            id,
            name: String::new(),
            description: None,
            address: None,
            logo_url: None,
            owner_id,
            created_at: now,
            updated_at: now,
        };
        company.update(details, now)?;
        Ok(company)
    }

    pub fn update(&mut self, details: CompanyDetails, now: Timestamp) -> Result<(), DomainError> {
        let name = details.name.trim().to_owned();
        if name.is_empty() {
            return Err(DomainError::invalid_argument("name", "cannot be empty"));
        }
        self.name = name;
        self.description = details.description;
        self.address = details.address;
        self.updated_at = now;
        Ok(())
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == Some(user_id)
    }

    pub fn set_logo(&mut self, logo_url: impl Into<String>, now: Timestamp) {
        self.logo_url = Some(logo_url.into());
        self.updated_at = now;
    }
}
