use application::dto::NotificationDto;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use domain::{NotificationId, Page};
use serde::Serialize;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::PageQuery;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list))
        .route("/notifications/latest", get(latest))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", put(mark_all_as_read))
        .route("/notifications/{id}/read", put(mark_as_read))
}

#[derive(Debug, Serialize)]
struct CountResponse {
    count: u64,
}

async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<NotificationDto>>, ApiError> {
    Ok(Json(
        state
            .notification_service
            .list(user.id, page.request())
            .await?,
    ))
}

async fn latest(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<NotificationDto>>, ApiError> {
    Ok(Json(state.notification_service.latest(user.id).await?))
}

async fn unread_count(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.notification_service.unread_count(user.id).await?;
    Ok(Json(CountResponse { count }))
}

async fn mark_as_read(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<NotificationId>,
) -> Result<StatusCode, ApiError> {
    state
        .notification_service
        .mark_as_read(user.id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn mark_all_as_read(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.notification_service.mark_all_as_read(user.id).await?;
    Ok(Json(CountResponse { count }))
}
