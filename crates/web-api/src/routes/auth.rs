use application::dto::{AuthResult, AuthTokenDto, SessionDto, UserDetailsDto};
use application::{DeviceInfo, LoginRequest, RegisterRequest, SessionUser};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use domain::Gender;
use serde::Deserialize;
use tracing::warn;
use validator::Validate;

use crate::auth::{cleared_refresh_cookie, read_cookie, refresh_cookie, CurrentUser, REFRESH_COOKIE};
use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh-token", post(refresh))
        .route("/auth/me", get(me))
        .route("/auth/me/details", get(me_details))
        .route("/auth/sessions", get(sessions))
        .route("/auth/sessions/{sessionId}", delete(remove_session))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct RegisterPayload {
    #[validate(length(min = 1, max = 255))]
    name: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 6, max = 100))]
    password: String,
    dob: Option<NaiveDate>,
    address: Option<String>,
    gender: Option<Gender>,
    #[serde(default)]
    recruiter: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionMetaPayload {
    device_name: Option<String>,
    device_type: Option<String>,
    user_agent: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct LoginPayload {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1))]
    password: String,
    #[serde(default)]
    session_meta: Option<SessionMetaPayload>,
}

/// 客户端未上报的字段用请求头补齐
fn device_info(meta: Option<SessionMetaPayload>, headers: &HeaderMap) -> DeviceInfo {
    let meta = meta.unwrap_or_default();
    let header_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    DeviceInfo {
        device_name: meta.device_name.unwrap_or_else(|| "Unknown".to_string()),
        device_type: meta.device_type.unwrap_or_else(|| "Unknown".to_string()),
        user_agent: meta
            .user_agent
            .unwrap_or_else(|| header_agent.to_string()),
    }
}

fn with_refresh_cookie(result: AuthResult) -> Result<impl IntoResponse, ApiError> {
    let cookie = refresh_cookie(&result.refresh_token, result.refresh_ttl_secs)?;
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json::<AuthTokenDto>(result.body),
    ))
}

async fn register(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RegisterPayload>,
) -> Result<(StatusCode, Json<SessionUser>), ApiError> {
    let user = state
        .auth_service
        .register(RegisterRequest {
            name: payload.name,
            email: payload.email,
            password: payload.password,
            dob: payload.dob,
            address: payload.address,
            gender: payload.gender,
            recruiter: payload.recruiter,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidJson(payload): ValidJson<LoginPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .auth_service
        .login(LoginRequest {
            email: payload.email,
            password: payload.password,
            device: device_info(payload.session_meta, &headers),
        })
        .await?;

    with_refresh_cookie(result)
}

/// 无论会话能否吊销都清除浏览器里的 Cookie
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Err(err) = state
        .auth_service
        .logout(read_cookie(&headers, REFRESH_COOKIE))
        .await
    {
        warn!(error = %err, "注销时吊销会话失败");
    }

    (
        StatusCode::OK,
        AppendHeaders([(header::SET_COOKIE, cleared_refresh_cookie())]),
    )
}

/// 请求体可以为空，此时只用请求头里的 User-Agent
async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let token = read_cookie(&headers, REFRESH_COOKIE).ok_or_else(ApiError::missing_cookie)?;
    let meta = if body.is_empty() {
        None
    } else {
        Some(
            serde_json::from_slice::<SessionMetaPayload>(&body)
                .map_err(|err| ApiError::validation(err.to_string()))?,
        )
    };

    let result = state
        .auth_service
        .refresh(token, device_info(meta, &headers))
        .await?;

    with_refresh_cookie(result)
}

async fn me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<SessionUser>, ApiError> {
    Ok(Json(state.auth_service.me(user.id).await?))
}

async fn me_details(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<UserDetailsDto>, ApiError> {
    Ok(Json(state.auth_service.me_details(user.id).await?))
}

async fn sessions(
    State(state): State<AppState>,
    headers: HeaderMap,
    _user: CurrentUser,
) -> Result<Json<Vec<SessionDto>>, ApiError> {
    let token = read_cookie(&headers, REFRESH_COOKIE).ok_or_else(ApiError::missing_cookie)?;
    Ok(Json(state.auth_service.sessions(token).await?))
}

async fn remove_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .auth_service
        .remove_session(user.id, &session_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
