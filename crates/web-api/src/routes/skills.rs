use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use domain::{Page, Skill, SkillId};
use serde::Deserialize;
use validator::Validate;

use crate::error::ApiError;
use crate::extract::{PageQuery, ValidJson};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/skills", post(create_skill).get(list_skills))
        .route(
            "/skills/{id}",
            get(get_skill).put(update_skill).delete(delete_skill),
        )
}

#[derive(Debug, Deserialize, Validate)]
struct SkillPayload {
    #[validate(length(min = 1, max = 100))]
    name: String,
}

#[derive(Debug, Deserialize)]
struct SkillListQuery {
    page: Option<u32>,
    size: Option<u32>,
    name: Option<String>,
}

async fn create_skill(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<SkillPayload>,
) -> Result<(StatusCode, Json<Skill>), ApiError> {
    let skill = state.skill_service.create(&payload.name).await?;
    Ok((StatusCode::CREATED, Json(skill)))
}

async fn list_skills(
    State(state): State<AppState>,
    Query(query): Query<SkillListQuery>,
) -> Result<Json<Page<Skill>>, ApiError> {
    Ok(Json(
        state
            .skill_service
            .list(
                query.name.as_deref(),
                PageQuery::new(query.page, query.size).request(),
            )
            .await?,
    ))
}

async fn get_skill(
    State(state): State<AppState>,
    Path(id): Path<SkillId>,
) -> Result<Json<Skill>, ApiError> {
    Ok(Json(state.skill_service.get(id).await?))
}

async fn update_skill(
    State(state): State<AppState>,
    Path(id): Path<SkillId>,
    ValidJson(payload): ValidJson<SkillPayload>,
) -> Result<Json<Skill>, ApiError> {
    Ok(Json(state.skill_service.update(id, &payload.name).await?))
}

async fn delete_skill(
    State(state): State<AppState>,
    Path(id): Path<SkillId>,
) -> Result<Json<Skill>, ApiError> {
    Ok(Json(state.skill_service.delete(id).await?))
}
