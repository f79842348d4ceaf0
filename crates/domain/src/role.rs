use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{PermissionId, RoleId, Timestamp};

/// 系统内置角色名称，启动时必须存在。
pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_USER: &str = "USER";
pub const ROLE_RECRUITER: &str = "RECRUITER";

pub const BUILTIN_ROLES: [&str; 3] = [ROLE_ADMIN, ROLE_USER, ROLE_RECRUITER];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
    pub api_path: String,
    pub method: String,
    pub module: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Permission {
    pub fn new(
        id: PermissionId,
        name: impl Into<String>,
        api_path: impl Into<String>,
        method: impl Into<String>,
        module: impl Into<String>,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        let mut permission = Self {
            id,
            name: String::new(),
            api_path: String::new(),
            method: String::new(),
            module: String::new(),
            created_at: now,
            updated_at: now,
        };
        permission.update(name, api_path, method, module, now)?;
        Ok(permission)
    }

    pub fn update(
        &mut self,
        name: impl Into<String>,
        api_path: impl Into<String>,
        method: impl Into<String>,
        module: impl Into<String>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let name = name.into().trim().to_owned();
        let api_path = api_path.into().trim().to_owned();
        let method = method.into().trim().to_ascii_uppercase();
        let module = module.into().trim().to_owned();

        if name.is_empty() {
            return Err(DomainError::invalid_argument("name", "cannot be empty"));
        }
        if !api_path.starts_with('/') {
            return Err(DomainError::invalid_argument("apiPath", "must start with '/'"));
        }
        if !matches!(
            method.as_str(),
            "GET" | "POST" | "PUT" | "PATCH" | "DELETE"
        ) {
            return Err(DomainError::invalid_argument("method", "unsupported HTTP method"));
        }

        self.name = name;
        self.api_path = api_path;
        self.method = method;
        self.module = module;
        self.updated_at = now;
        Ok(())
    }

    /// JWT 中携带的权限字符串，例如 `PUT /notifications/{id}/read`。
    pub fn authority(&self) -> String {
        format!("{} {}", self.method, self.api_path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub permissions: Vec<Permission>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Role {
    pub fn new(
        id: RoleId,
        name: impl Into<String>,
        description: Option<String>,
        active: bool,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        let name = normalize_role_name(name.into())?;
        Ok(Self {
            id,
            name,
            description,
            active,
            permissions: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn rename(&mut self, name: impl Into<String>, now: Timestamp) -> Result<(), DomainError> {
        self.name = normalize_role_name(name.into())?;
        self.updated_at = now;
        Ok(())
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn authorities(&self) -> Vec<String> {
        if !self.active {
            return Vec::new();
        }
        self.permissions.iter().map(Permission::authority).collect()
    }
}

fn normalize_role_name(name: String) -> Result<String, DomainError> {
    let name = name.trim().to_ascii_uppercase();
    if name.is_empty() {
        return Err(DomainError::invalid_argument("name", "cannot be empty"));
    }
    Ok(name)
}
