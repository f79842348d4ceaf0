//! 基于路由模板的访问控制
//!
//! 每个请求按 `"{METHOD} {路由模板}"` 归入三类之一：公开、仅需登录、需要对应权限。
//! 权限串与 `permissions` 表中的 `method` + `api_path` 一一对应。

use axum::{
    extract::{MatchedPath, Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::auth::{bearer_token, CurrentUser};
use crate::error::ApiError;
use crate::state::AppState;

pub const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Permission(String),
}

const PUBLIC_ROUTES: &[(Method, &str)] = &[
    (Method::POST, "/auth/register"),
    (Method::POST, "/auth/login"),
    (Method::POST, "/auth/logout"),
    (Method::POST, "/auth/refresh-token"),
    (Method::POST, "/auth/password/forgot"),
    (Method::POST, "/auth/password/resend-otp"),
    (Method::POST, "/auth/password/verify-otp"),
    (Method::POST, "/auth/password/reset"),
    (Method::GET, "/jobs"),
    (Method::GET, "/jobs/{id}"),
    (Method::GET, "/jobs/company/{companyId}"),
    (Method::GET, "/companies"),
    (Method::GET, "/companies/{id}"),
    (Method::GET, "/skills"),
    (Method::GET, "/skills/{id}"),
    (Method::GET, "/payments/vnpay-return"),
];

const AUTHENTICATED_ROUTES: &[(Method, &str)] = &[
    (Method::GET, "/auth/me"),
    (Method::GET, "/auth/me/details"),
    (Method::GET, "/auth/sessions"),
    (Method::DELETE, "/auth/sessions/{sessionId}"),
    (Method::POST, "/payments/create"),
    (Method::GET, "/payments/check/{jobId}"),
];

/// 个人资料接口只要求登录
const SELF_SERVICE_PREFIX: &str = "/users/me/";

pub fn required_access(method: &Method, template: &str) -> Access {
    let matches = |routes: &[(Method, &str)]| {
        routes
            .iter()
            .any(|(m, path)| m == method && *path == template)
    };

    if matches(PUBLIC_ROUTES) {
        Access::Public
    } else if matches(AUTHENTICATED_ROUTES) || template.starts_with(SELF_SERVICE_PREFIX) {
        Access::Authenticated
    } else {
        Access::Permission(format!("{} {}", method, template))
    }
}

/// 鉴权中间件：通过后把 [`CurrentUser`] 放入请求扩展
pub async fn authorize(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let template = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let template = template
        .strip_prefix(API_PREFIX)
        .unwrap_or(&template)
        .to_owned();

    let access = required_access(request.method(), &template);
    if access == Access::Public {
        return Ok(next.run(request).await);
    }

    let token = bearer_token(request.headers())?;
    let verified = state.token_codec.verify(token)?;

    if let Access::Permission(authority) = &access {
        if !verified.permissions.iter().any(|p| p == authority) {
            debug!(user_id = %verified.user.id, %authority, "缺少接口权限");
            return Err(ApiError::forbidden(format!("missing permission {authority}")));
        }
    }

    let mut user = verified.user;
    user.permissions = verified.permissions;
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_routes() {
        assert_eq!(required_access(&Method::GET, "/jobs/{id}"), Access::Public);
        assert_eq!(required_access(&Method::POST, "/auth/login"), Access::Public);
        assert_eq!(
            required_access(&Method::GET, "/payments/vnpay-return"),
            Access::Public
        );
    }

    #[test]
    fn test_same_path_different_method_needs_permission() {
        assert_eq!(
            required_access(&Method::POST, "/jobs"),
            Access::Permission("POST /jobs".to_string())
        );
        assert_eq!(
            required_access(&Method::GET, "/jobs/me"),
            Access::Permission("GET /jobs/me".to_string())
        );
    }

    #[test]
    fn test_self_service_routes_need_login_only() {
        assert_eq!(
            required_access(&Method::PUT, "/users/me/password"),
            Access::Authenticated
        );
        assert_eq!(
            required_access(&Method::DELETE, "/auth/sessions/{sessionId}"),
            Access::Authenticated
        );
        assert_eq!(
            required_access(&Method::PUT, "/notifications/{id}/read"),
            Access::Permission("PUT /notifications/{id}/read".to_string())
        );
    }
}
