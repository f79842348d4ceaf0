use std::sync::Arc;

use chrono::NaiveDate;
use domain::{
    CompanyId, Email, Gender, Page, PageRequest, RoleId, User, UserId, UserProfile,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    clock::Clock,
    dto::{Assignment, UserDto},
    error::ApplicationError,
    password::PasswordHasher,
    repository::{CompanyRepository, ResumeRepository, RoleRepository, UserFilter, UserRepository},
    storage::{file_extension, FileStorage},
};

use super::require_user;

#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub dob: Option<NaiveDate>,
    pub address: Option<String>,
    pub gender: Option<Gender>,
    pub company_id: Option<CompanyId>,
    pub role_id: Option<RoleId>,
}

#[derive(Debug, Clone)]
pub struct UpdateUserRequest {
    pub id: UserId,
    pub profile: UserProfile,
    pub company: Assignment<CompanyId>,
    pub role: Assignment<RoleId>,
}

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub company_repository: Arc<dyn CompanyRepository>,
    pub role_repository: Arc<dyn RoleRepository>,
    pub resume_repository: Arc<dyn ResumeRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub file_storage: Arc<dyn FileStorage>,
    pub clock: Arc<dyn Clock>,
}

/// 用户管理（管理员）与个人资料维护（本人）
pub struct UserService {
    deps: UserServiceDependencies,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn create(&self, request: CreateUserRequest) -> Result<UserDto, ApplicationError> {
        let email = Email::parse(request.email)?;
        if self
            .deps
            .user_repository
            .find_by_email(&email)
            .await?
            .is_some()
        {
            return Err(ApplicationError::already_exists("user", email.as_str()));
        }

        let password = self
            .deps
            .password_hasher
            .hash(request.password.trim())
            .await?;
        let now = self.deps.clock.now();
        let mut user = User::register(
            UserId::generate(),
            UserProfile {
                name: request.name,
                dob: request.dob,
                address: request.address,
                gender: request.gender,
            },
            email,
            password,
            None,
            now,
        )?;
        if let Some(company_id) = request.company_id {
            self.ensure_company(company_id).await?;
            user.assign_company(Some(company_id), now);
        }
        if let Some(role_id) = request.role_id {
            self.ensure_role(role_id).await?;
            user.assign_role(Some(role_id), now);
        }

        let stored = self.deps.user_repository.create(user).await?;
        info!(user_id = %stored.id, "管理员创建用户");
        self.to_dto(&stored).await
    }

    pub async fn list(
        &self,
        filter: UserFilter,
        page: PageRequest,
    ) -> Result<Page<UserDto>, ApplicationError> {
        let users = self.deps.user_repository.list(&filter, page).await?;
        let mut content = Vec::with_capacity(users.content.len());
        for user in &users.content {
            content.push(self.to_dto(user).await?);
        }
        Ok(Page::new(content, page, users.total_elements))
    }

    pub async fn get(&self, id: UserId) -> Result<UserDto, ApplicationError> {
        let user = require_user(self.deps.user_repository.as_ref(), id).await?;
        self.to_dto(&user).await
    }

    pub async fn update(&self, request: UpdateUserRequest) -> Result<UserDto, ApplicationError> {
        let mut user = require_user(self.deps.user_repository.as_ref(), request.id).await?;
        let now = self.deps.clock.now();
        user.update_profile(request.profile, now)?;

        match request.company {
            Assignment::Keep => {}
            Assignment::Clear => user.assign_company(None, now),
            Assignment::Set(company_id) => {
                self.ensure_company(company_id).await?;
                user.assign_company(Some(company_id), now);
            }
        }
        match request.role {
            Assignment::Keep => {}
            Assignment::Clear => user.assign_role(None, now),
            Assignment::Set(role_id) => {
                self.ensure_role(role_id).await?;
                user.assign_role(Some(role_id), now);
            }
        }

        let stored = self.deps.user_repository.update(user).await?;
        self.to_dto(&stored).await
    }

    /// 删除用户及其投递文件
    pub async fn delete(&self, id: UserId) -> Result<UserDto, ApplicationError> {
        let user = require_user(self.deps.user_repository.as_ref(), id).await?;
        let dto = self.to_dto(&user).await?;
        let resumes = self.deps.resume_repository.list_all_by_user(id).await?;

        self.deps.user_repository.delete(id).await?;
        for resume in resumes {
            if let Err(err) = self.deps.file_storage.delete(&resume.file_key).await {
                warn!(error = %err, key = %resume.file_key, "删除简历文件失败");
            }
        }
        info!(user_id = %id, "删除用户");
        Ok(dto)
    }

    pub async fn update_self_profile(
        &self,
        user_id: UserId,
        profile: UserProfile,
    ) -> Result<UserDto, ApplicationError> {
        let mut user = require_user(self.deps.user_repository.as_ref(), user_id).await?;
        user.update_profile(profile, self.deps.clock.now())?;
        let stored = self.deps.user_repository.update(user).await?;
        self.to_dto(&stored).await
    }

    pub async fn change_self_password(
        &self,
        user_id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<UserDto, ApplicationError> {
        let mut user = require_user(self.deps.user_repository.as_ref(), user_id).await?;
        let matches = self
            .deps
            .password_hasher
            .verify(old_password, &user.password)
            .await?;
        if !matches {
            return Err(ApplicationError::conflict("mật khẩu hiện tại không chính xác"));
        }

        let password = self.deps.password_hasher.hash(new_password).await?;
        user.set_password(password, self.deps.clock.now());
        let stored = self.deps.user_repository.update(user).await?;
        info!(user_id = %user_id, "用户修改密码");
        self.to_dto(&stored).await
    }

    /// 头像保存为 `avatar/{userId}-{uuid}.{ext}`
    pub async fn update_self_avatar(
        &self,
        user_id: UserId,
        bytes: Vec<u8>,
        filename: Option<&str>,
    ) -> Result<UserDto, ApplicationError> {
        if bytes.is_empty() {
            return Err(ApplicationError::invalid_argument("avatar", "file is empty"));
        }
        let mut user = require_user(self.deps.user_repository.as_ref(), user_id).await?;

        let key = format!(
            "avatar/{}-{}.{}",
            user.id,
            Uuid::new_v4(),
            file_extension(filename)
        );
        self.deps.file_storage.put(&key, bytes).await?;
        user.set_logo(self.deps.file_storage.public_url(&key), self.deps.clock.now());

        let stored = self.deps.user_repository.update(user).await?;
        self.to_dto(&stored).await
    }

    async fn ensure_company(&self, id: CompanyId) -> Result<(), ApplicationError> {
        self.deps
            .company_repository
            .find_by_id(id)
            .await?
            .map(|_| ())
            .ok_or_else(|| ApplicationError::not_found("company", id))
    }

    async fn ensure_role(&self, id: RoleId) -> Result<(), ApplicationError> {
        self.deps
            .role_repository
            .find_by_id(id)
            .await?
            .map(|_| ())
            .ok_or_else(|| ApplicationError::not_found("role", id))
    }

    async fn to_dto(&self, user: &User) -> Result<UserDto, ApplicationError> {
        let company = match user.company_id {
            Some(id) => self.deps.company_repository.find_by_id(id).await?,
            None => None,
        };
        let role = match user.role_id {
            Some(id) => self.deps.role_repository.find_by_id(id).await?,
            None => None,
        };
        Ok(UserDto::new(user, company.as_ref(), role.as_ref()))
    }
}
