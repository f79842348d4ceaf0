//! 职位订阅与推荐邮件
use application::dto::SubscriberDto;
use application::SubscriberRequest;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use domain::SkillId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/subscribers/me",
            get(get_own)
                .post(create_own)
                .put(update_own)
                .delete(delete_own),
        )
        .route(
            "/emails/job-recommendation/{email}",
            post(send_recommendation),
        )
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct SubscriberPayload {
    #[validate(length(min = 1, max = 255))]
    name: String,
    #[serde(default)]
    skill_ids: Vec<SkillId>,
}

impl From<SubscriberPayload> for SubscriberRequest {
    fn from(payload: SubscriberPayload) -> Self {
        Self {
            name: payload.name,
            skill_ids: payload.skill_ids,
        }
    }
}

#[derive(Debug, Serialize)]
struct SentResponse {
    sent: bool,
}

async fn create_own(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidJson(payload): ValidJson<SubscriberPayload>,
) -> Result<(StatusCode, Json<SubscriberDto>), ApiError> {
    let subscriber = state
        .subscriber_service
        .create_self(user.id, payload.into())
        .await?;
    Ok((StatusCode::CREATED, Json(subscriber)))
}

async fn get_own(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<SubscriberDto>, ApiError> {
    Ok(Json(state.subscriber_service.get_self(user.id).await?))
}

async fn update_own(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidJson(payload): ValidJson<SubscriberPayload>,
) -> Result<Json<SubscriberDto>, ApiError> {
    Ok(Json(
        state
            .subscriber_service
            .update_self(user.id, payload.into())
            .await?,
    ))
}

async fn delete_own(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<StatusCode, ApiError> {
    state.subscriber_service.delete_self(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 立即给指定订阅者发送一封推荐邮件；没有匹配职位时 `sent` 为 false
async fn send_recommendation(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<SentResponse>, ApiError> {
    let sent = state.subscriber_service.send_to(&email).await?;
    Ok(Json(SentResponse { sent }))
}
