use std::sync::Arc;

use chrono::NaiveDate;
use domain::{
    Email, Gender, Role, SessionKey, SessionMeta, User, UserId, UserProfile, ROLE_RECRUITER,
    ROLE_USER,
};
use tracing::info;

use crate::{
    clock::Clock,
    dto::{AuthResult, AuthTokenDto, SessionDto, UserDetailsDto},
    error::ApplicationError,
    password::PasswordHasher,
    repository::{RoleRepository, UserRepository},
    session_store::RefreshTokenStore,
    token::{SessionUser, TokenCodec, TokenKind},
};

use super::require_user;

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub dob: Option<NaiveDate>,
    pub address: Option<String>,
    pub gender: Option<Gender>,
    pub recruiter: bool,
}

/// 客户端上报的设备信息
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    pub device_name: String,
    pub device_type: String,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub device: DeviceInfo,
}

pub struct AuthServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub role_repository: Arc<dyn RoleRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub token_codec: Arc<dyn TokenCodec>,
    pub refresh_tokens: Arc<dyn RefreshTokenStore>,
    pub clock: Arc<dyn Clock>,
}

pub struct AuthService {
    deps: AuthServiceDependencies,
}

/// 由用户与其角色拼出令牌中的会话信息
pub fn session_user(user: &User, role: Option<&Role>) -> SessionUser {
    SessionUser {
        id: user.id,
        email: user.email.as_str().to_owned(),
        name: user.name.clone(),
        company_id: user.company_id,
        role: role.map(|r| r.name.clone()),
        permissions: role.map(Role::authorities).unwrap_or_default(),
        logo_url: user.logo_url.clone(),
        updated_at: user.updated_at,
    }
}

impl AuthService {
    pub fn new(deps: AuthServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<SessionUser, ApplicationError> {
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

        let role_name = if request.recruiter {
            ROLE_RECRUITER
        } else {
            ROLE_USER
        };
        let role = self
            .deps
            .role_repository
            .find_by_name(role_name)
            .await?
            .ok_or_else(|| ApplicationError::not_found("role", role_name))?;

        let password = self.deps.password_hasher.hash(&request.password).await?;
        let user = User::register(
            UserId::generate(),
            UserProfile {
                name: request.name,
                dob: request.dob,
                address: request.address,
                gender: request.gender,
            },
            email,
            password,
            Some(role.id),
            self.deps.clock.now(),
        )?;
        let stored = self.deps.user_repository.create(user).await?;

        info!(user_id = %stored.id, role = %role.name, "新用户注册");
        Ok(session_user(&stored, Some(&role)))
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResult, ApplicationError> {
        let email = Email::parse(request.email).map_err(|_| ApplicationError::Authentication)?;
        let user = self
            .deps
            .user_repository
            .find_by_email(&email)
            .await?
            .ok_or(ApplicationError::Authentication)?;

        let password_ok = self
            .deps
            .password_hasher
            .verify(&request.password, &user.password)
            .await?;
        if !password_ok {
            return Err(ApplicationError::Authentication);
        }

        info!(user_id = %user.id, device = %request.device.device_name, "用户登录");
        self.issue_session(&user, request.device).await
    }

    /// 删除当前刷新令牌对应的会话；未携带令牌时直接返回。
    pub async fn logout(&self, refresh_token: Option<&str>) -> Result<(), ApplicationError> {
        let Some(token) = refresh_token else {
            return Ok(());
        };
        let user = self.user_from_token(token).await?;
        self.deps
            .refresh_tokens
            .delete(&SessionKey::new(token, user.id))
            .await?;
        info!(user_id = %user.id, "用户登出");
        Ok(())
    }

    /// 轮换刷新令牌：旧令牌作废，签发新的一对令牌。
    pub async fn refresh(
        &self,
        refresh_token: &str,
        device: DeviceInfo,
    ) -> Result<AuthResult, ApplicationError> {
        let verified = self.deps.token_codec.verify(refresh_token)?;
        let email = Email::parse(verified.subject.as_str())
            .map_err(|_| ApplicationError::InvalidToken)?;
        let user = self
            .deps
            .user_repository
            .find_by_email(&email)
            .await?
            .ok_or_else(|| ApplicationError::not_found("user", email.as_str()))?;

        let key = SessionKey::new(refresh_token, user.id);
        if !self.deps.refresh_tokens.exists(&key).await? {
            return Err(ApplicationError::InvalidToken);
        }
        if !user.email.matches(&verified.subject) {
            return Err(ApplicationError::InvalidToken);
        }

        self.deps.refresh_tokens.delete(&key).await?;
        self.issue_session(&user, device).await
    }

    pub async fn me(&self, user_id: UserId) -> Result<SessionUser, ApplicationError> {
        let user = require_user(self.deps.user_repository.as_ref(), user_id).await?;
        let role = self.role_of(&user).await?;
        Ok(session_user(&user, role.as_ref()))
    }

    pub async fn me_details(&self, user_id: UserId) -> Result<UserDetailsDto, ApplicationError> {
        let user = require_user(self.deps.user_repository.as_ref(), user_id).await?;
        Ok(UserDetailsDto::from(&user))
    }

    /// 列出该刷新令牌所属用户的全部登录会话，最近登录在前。
    pub async fn sessions(&self, refresh_token: &str) -> Result<Vec<SessionDto>, ApplicationError> {
        let user = self.user_from_token(refresh_token).await?;
        let mut sessions: Vec<SessionDto> = self
            .deps
            .refresh_tokens
            .list_for_user(user.id)
            .await?
            .into_iter()
            .map(|(key, meta)| {
                let current = key.token() == Some(refresh_token);
                SessionDto::new(key.as_str().to_owned(), meta, current)
            })
            .collect();
        sessions.sort_by(|a, b| b.login_at.cmp(&a.login_at));
        Ok(sessions)
    }

    pub async fn remove_session(
        &self,
        user_id: UserId,
        session_id: &str,
    ) -> Result<(), ApplicationError> {
        let key = SessionKey::from_raw(session_id);
        let owner = user_id.to_string();
        if !key
            .owner()
            .is_some_and(|id| id.eq_ignore_ascii_case(&owner))
        {
            return Err(ApplicationError::access_denied(
                "Không có quyền truy cập",
            ));
        }
        self.deps.refresh_tokens.delete(&key).await?;
        info!(user_id = %user_id, "移除登录会话");
        Ok(())
    }

    async fn user_from_token(&self, token: &str) -> Result<User, ApplicationError> {
        let verified = self.deps.token_codec.verify(token)?;
        let email = Email::parse(verified.subject).map_err(|_| ApplicationError::InvalidToken)?;
        self.deps
            .user_repository
            .find_by_email(&email)
            .await?
            .ok_or_else(|| ApplicationError::not_found("user", email.as_str()))
    }

    async fn role_of(&self, user: &User) -> Result<Option<Role>, ApplicationError> {
        match user.role_id {
            Some(role_id) => Ok(self.deps.role_repository.find_by_id(role_id).await?),
            None => Ok(None),
        }
    }

    async fn issue_session(
        &self,
        user: &User,
        device: DeviceInfo,
    ) -> Result<AuthResult, ApplicationError> {
        let role = self.role_of(user).await?;
        let session = session_user(user, role.as_ref());

        let refresh_token = self.deps.token_codec.issue(&session, TokenKind::Refresh)?;
        let refresh_ttl_secs = self.deps.token_codec.ttl_secs(TokenKind::Refresh);
        let meta = SessionMeta {
            device_name: device.device_name,
            device_type: device.device_type,
            user_agent: device.user_agent,
            login_at: self.deps.clock.now(),
        };
        self.deps
            .refresh_tokens
            .save(
                &SessionKey::new(&refresh_token, user.id),
                &meta,
                refresh_ttl_secs.max(0) as u64,
            )
            .await?;

        let access_token = self.deps.token_codec.issue(&session, TokenKind::Access)?;
        Ok(AuthResult {
            body: AuthTokenDto {
                user: session,
                access_token,
            },
            refresh_token,
            refresh_ttl_secs,
        })
    }
}
