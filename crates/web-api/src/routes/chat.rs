use application::dto::{ChatAnswerDto, ChatMessageDto, ChatSessionDto, ChatSessionInfoDto};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/chat/messages", post(send_message))
        .route("/chat/sessions", get(list_sessions).post(new_session))
        .route("/chat/sessions/{sessionId}/info", get(session_info))
        .route(
            "/chat/history/{sessionId}",
            get(history).delete(clear_history),
        )
}

/// 长度上限由服务层校验，这里只拦截空值
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ChatPayload {
    #[validate(length(min = 1))]
    message: String,
    #[validate(length(min = 1))]
    session_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewSessionResponse {
    session_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClearedResponse {
    deleted: u64,
}

async fn send_message(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidJson(payload): ValidJson<ChatPayload>,
) -> Result<Json<ChatAnswerDto>, ApiError> {
    Ok(Json(
        state
            .chat_service
            .send(user.id, &payload.session_id, &payload.message)
            .await?,
    ))
}

async fn new_session(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<(StatusCode, Json<NewSessionResponse>), ApiError> {
    let session_id = state.chat_service.new_session(user.id).await?;
    Ok((StatusCode::CREATED, Json(NewSessionResponse { session_id })))
}

async fn list_sessions(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ChatSessionDto>>, ApiError> {
    Ok(Json(state.chat_service.sessions(user.id).await?))
}

async fn session_info(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
) -> Result<Json<ChatSessionInfoDto>, ApiError> {
    Ok(Json(
        state
            .chat_service
            .session_info(user.id, &session_id)
            .await?,
    ))
}

async fn history(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<ChatMessageDto>>, ApiError> {
    Ok(Json(
        state.chat_service.history(user.id, &session_id).await?,
    ))
}

async fn clear_history(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
) -> Result<Json<ClearedResponse>, ApiError> {
    let deleted = state.chat_service.clear(user.id, &session_id).await?;
    Ok(Json(ClearedResponse { deleted }))
}
