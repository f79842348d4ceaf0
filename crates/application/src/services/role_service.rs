use std::sync::Arc;

use domain::{
    Page, PageRequest, Permission, PermissionId, Role, RoleId, BUILTIN_ROLES,
};
use tracing::info;

use crate::{
    clock::Clock,
    error::ApplicationError,
    repository::{PermissionRepository, RoleRepository},
};

#[derive(Debug, Clone)]
pub struct RoleRequest {
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub permission_ids: Vec<PermissionId>,
}

#[derive(Debug, Clone)]
pub struct PermissionRequest {
    pub name: String,
    pub api_path: String,
    pub method: String,
    pub module: String,
}

pub struct RoleServiceDependencies {
    pub role_repository: Arc<dyn RoleRepository>,
    pub permission_repository: Arc<dyn PermissionRepository>,
    pub clock: Arc<dyn Clock>,
}

/// 角色与权限目录维护
pub struct RoleService {
    deps: RoleServiceDependencies,
}

impl RoleService {
    pub fn new(deps: RoleServiceDependencies) -> Self {
        Self { deps }
    }

    /// 启动检查：内置角色缺失时返回错误
    pub async fn verify_builtin_roles(&self) -> Result<(), ApplicationError> {
        for name in BUILTIN_ROLES {
            if self.deps.role_repository.find_by_name(name).await?.is_none() {
                return Err(ApplicationError::infrastructure(format!(
                    "built-in role {name} is missing"
                )));
            }
        }
        info!(roles = ?BUILTIN_ROLES, "内置角色检查通过");
        Ok(())
    }

    pub async fn create_role(&self, request: RoleRequest) -> Result<Role, ApplicationError> {
        let mut role = Role::new(
            RoleId::generate(),
            request.name,
            request.description,
            request.active,
            self.deps.clock.now(),
        )?;
        self.ensure_role_name_free(&role.name, None).await?;
        role.permissions = self.resolve_permissions(&request.permission_ids).await?;

        let stored = self.deps.role_repository.create(role).await?;
        info!(role_id = %stored.id, role = %stored.name, "创建角色");
        Ok(stored)
    }

    pub async fn update_role(
        &self,
        id: RoleId,
        request: RoleRequest,
    ) -> Result<Role, ApplicationError> {
        let mut role = self.get_role(id).await?;
        let now = self.deps.clock.now();
        role.rename(request.name, now)?;
        self.ensure_role_name_free(&role.name, Some(id)).await?;

        role.description = request.description;
        role.active = request.active;
        role.permissions = self.resolve_permissions(&request.permission_ids).await?;
        Ok(self.deps.role_repository.update(role).await?)
    }

    pub async fn get_role(&self, id: RoleId) -> Result<Role, ApplicationError> {
        self.deps
            .role_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("role", id))
    }

    pub async fn list_roles(&self, page: PageRequest) -> Result<Page<Role>, ApplicationError> {
        Ok(self.deps.role_repository.list(page).await?)
    }

    /// 删除角色，持有该角色的用户被解绑
    pub async fn delete_role(&self, id: RoleId) -> Result<Role, ApplicationError> {
        let role = self.get_role(id).await?;
        self.deps.role_repository.delete(id).await?;
        info!(role_id = %id, role = %role.name, "删除角色");
        Ok(role)
    }

    pub async fn create_permission(
        &self,
        request: PermissionRequest,
    ) -> Result<Permission, ApplicationError> {
        let permission = Permission::new(
            PermissionId::generate(),
            request.name,
            request.api_path,
            request.method,
            request.module,
            self.deps.clock.now(),
        )?;
        self.ensure_route_free(&permission, None).await?;
        Ok(self.deps.permission_repository.create(permission).await?)
    }

    pub async fn update_permission(
        &self,
        id: PermissionId,
        request: PermissionRequest,
    ) -> Result<Permission, ApplicationError> {
        let mut permission = self.get_permission(id).await?;
        permission.update(
            request.name,
            request.api_path,
            request.method,
            request.module,
            self.deps.clock.now(),
        )?;
        self.ensure_route_free(&permission, Some(id)).await?;
        Ok(self.deps.permission_repository.update(permission).await?)
    }

    pub async fn get_permission(&self, id: PermissionId) -> Result<Permission, ApplicationError> {
        self.deps
            .permission_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("permission", id))
    }

    pub async fn list_permissions(
        &self,
        page: PageRequest,
    ) -> Result<Page<Permission>, ApplicationError> {
        Ok(self.deps.permission_repository.list(page).await?)
    }

    pub async fn list_all_permissions(&self) -> Result<Vec<Permission>, ApplicationError> {
        Ok(self.deps.permission_repository.list_all().await?)
    }

    /// 删除权限并从所有角色中移除
    pub async fn delete_permission(&self, id: PermissionId) -> Result<Permission, ApplicationError> {
        let permission = self.get_permission(id).await?;
        self.deps.permission_repository.delete(id).await?;
        info!(permission = %permission.authority(), "删除权限");
        Ok(permission)
    }

    async fn ensure_role_name_free(
        &self,
        name: &str,
        current: Option<RoleId>,
    ) -> Result<(), ApplicationError> {
        match self.deps.role_repository.find_by_name(name).await? {
            Some(existing) if Some(existing.id) != current => {
                Err(ApplicationError::already_exists("role", name))
            }
            _ => Ok(()),
        }
    }

    async fn ensure_route_free(
        &self,
        permission: &Permission,
        current: Option<PermissionId>,
    ) -> Result<(), ApplicationError> {
        let existing = self
            .deps
            .permission_repository
            .find_by_method_and_path(&permission.method, &permission.api_path)
            .await?;
        match existing {
            Some(existing) if Some(existing.id) != current => Err(
                ApplicationError::already_exists("permission", permission.authority()),
            ),
            _ => Ok(()),
        }
    }

    /// 每个权限 ID 都必须存在
    async fn resolve_permissions(
        &self,
        ids: &[PermissionId],
    ) -> Result<Vec<Permission>, ApplicationError> {
        let permissions = self.deps.permission_repository.find_by_ids(ids).await?;
        if let Some(missing) = ids
            .iter()
            .find(|id| !permissions.iter().any(|p| p.id == **id))
        {
            return Err(ApplicationError::not_found("permission", missing));
        }
        Ok(permissions)
    }
}
