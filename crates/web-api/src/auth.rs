//! JWT 认证模块
//!
//! 提供访问令牌 / 刷新令牌的签发与校验、刷新令牌 Cookie 的读写，
//! 以及从请求扩展中取出当前用户的提取器。

use std::ops::Deref;

use application::{ApplicationError, SessionUser, TokenCodec, TokenKind, VerifiedToken};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
};
use chrono::Utc;
use config::JwtConfig;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

pub const REFRESH_COOKIE: &str = "refresh_token";

/// JWT Claims 结构
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// 用户邮箱
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// 同一秒内签发的令牌也互不相同
    pub jti: String,
    pub user: SessionUser,
    pub permissions: Vec<String>,
}

/// HS256 令牌服务
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_ref());
        let decoding_key = DecodingKey::from_secret(config.secret.as_ref());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }
}

impl TokenCodec for JwtService {
    fn issue(&self, user: &SessionUser, kind: TokenKind) -> Result<String, ApplicationError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.email.clone(),
            iat: now,
            exp: now + self.ttl_secs(kind),
            jti: Uuid::new_v4().to_string(),
            user: user.clone(),
            permissions: user.permissions.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|err| {
            ApplicationError::infrastructure(format!("token generation failed: {err}"))
        })
    }

    fn verify(&self, token: &str) -> Result<VerifiedToken, ApplicationError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| ApplicationError::InvalidToken)?;

        Ok(VerifiedToken {
            subject: claims.sub,
            user: claims.user,
            permissions: claims.permissions,
            expires_at: claims.exp,
        })
    }

    fn ttl_secs(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.config.access_token_expiration_secs,
            TokenKind::Refresh => self.config.refresh_token_expiration_secs,
        }
    }
}

/// 取出 `Authorization: Bearer <token>` 中的令牌
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Invalid authorization header format"))
}

/// 读取指定名称的 Cookie
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

pub fn refresh_cookie(token: &str, max_age_secs: i64) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&format!(
        "{REFRESH_COOKIE}={token}; HttpOnly; Path=/; SameSite=Strict; Max-Age={max_age_secs}"
    ))
    .map_err(|_| ApiError::internal_server_error("invalid cookie value"))
}

pub fn cleared_refresh_cookie() -> HeaderValue {
    HeaderValue::from_static("refresh_token=; HttpOnly; Path=/; SameSite=Strict; Max-Age=0")
}

/// 通过鉴权中间件的当前用户
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionUser);

impl Deref for CurrentUser {
    type Target = SessionUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("authentication required"))
    }
}
