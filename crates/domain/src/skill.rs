use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{SkillId, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Skill {
    pub fn new(id: SkillId, name: impl Into<String>, now: Timestamp) -> Result<Self, DomainError> {
        Ok(Self {
            id,
            name: normalize(name.into())?,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn rename(&mut self, name: impl Into<String>, now: Timestamp) -> Result<(), DomainError> {
        self.name = normalize(name.into())?;
        self.updated_at = now;
        Ok(())
    }
}

fn normalize(name: String) -> Result<String, DomainError> {
    let name = name.trim().to_owned();
    if name.is_empty() {
        return Err(DomainError::invalid_argument("name", "cannot be empty"));
    }
    Ok(name)
}
