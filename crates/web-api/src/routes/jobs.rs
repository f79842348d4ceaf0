use application::dto::{JobDto, LevelCountDto};
use application::{JobFilter, JobRequest, Scope};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use domain::{CompanyId, JobDetails, JobId, JobLevel, JobStatus, Page, SkillId, Timestamp};
use serde::Deserialize;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::{PageQuery, ValidJson};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/stats/level", get(stats_by_level))
        .route("/jobs/company/{companyId}", get(list_by_company))
        .route(
            "/jobs/{id}",
            get(get_job).put(update_job).delete(delete_job),
        )
        .route("/jobs/me", get(list_own_jobs).post(create_own_job))
        .route("/jobs/me/stats/level", get(own_stats_by_level))
        .route("/jobs/me/{id}", put(update_own_job).delete(delete_own_job))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct JobPayload {
    #[validate(length(min = 1, max = 255))]
    name: String,
    #[validate(length(min = 1, max = 255))]
    location: String,
    #[validate(range(min = 0.0))]
    salary: f64,
    #[validate(range(min = 1))]
    quantity: i32,
    level: JobLevel,
    #[serde(default)]
    description: String,
    start_date: Timestamp,
    end_date: Timestamp,
    #[serde(default = "default_status")]
    status: JobStatus,
    company_id: Option<CompanyId>,
    #[serde(default)]
    skill_ids: Vec<SkillId>,
}

fn default_status() -> JobStatus {
    JobStatus::Active
}

impl From<JobPayload> for JobRequest {
    fn from(payload: JobPayload) -> Self {
        Self {
            details: JobDetails {
                name: payload.name,
                location: payload.location,
                salary: payload.salary,
                quantity: payload.quantity,
                level: payload.level,
                description: payload.description,
                start_date: payload.start_date,
                end_date: payload.end_date,
                status: payload.status,
            },
            company_id: payload.company_id,
            skill_ids: payload.skill_ids,
        }
    }
}

#[derive(Debug, Deserialize)]
struct JobListQuery {
    page: Option<u32>,
    size: Option<u32>,
    name: Option<String>,
    location: Option<String>,
    level: Option<JobLevel>,
}

async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Result<Json<Page<JobDto>>, ApiError> {
    let filter = JobFilter {
        name: query.name,
        location: query.location,
        level: query.level,
    };
    Ok(Json(
        state
            .job_service
            .list(filter, PageQuery::new(query.page, query.size).request())
            .await?,
    ))
}

async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> Result<Json<JobDto>, ApiError> {
    Ok(Json(state.job_service.get(id).await?))
}

async fn list_by_company(
    State(state): State<AppState>,
    Path(company_id): Path<CompanyId>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<JobDto>>, ApiError> {
    Ok(Json(
        state
            .job_service
            .list_by_company(company_id, page.request())
            .await?,
    ))
}

async fn create_job(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<JobPayload>,
) -> Result<(StatusCode, Json<JobDto>), ApiError> {
    let job = state
        .job_service
        .create(payload.into(), Scope::Admin)
        .await?;
    Ok((StatusCode::CREATED, Json(job)))
}

async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
    ValidJson(payload): ValidJson<JobPayload>,
) -> Result<Json<JobDto>, ApiError> {
    Ok(Json(
        state
            .job_service
            .update(id, payload.into(), Scope::Admin)
            .await?,
    ))
}

async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> Result<Json<JobDto>, ApiError> {
    Ok(Json(state.job_service.delete(id, Scope::Admin).await?))
}

async fn stats_by_level(
    State(state): State<AppState>,
) -> Result<Json<Vec<LevelCountDto>>, ApiError> {
    Ok(Json(state.job_service.count_by_level(Scope::Admin).await?))
}

async fn list_own_jobs(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<JobDto>>, ApiError> {
    Ok(Json(
        state
            .job_service
            .list_for_recruiter(user.id, page.request())
            .await?,
    ))
}

async fn create_own_job(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidJson(payload): ValidJson<JobPayload>,
) -> Result<(StatusCode, Json<JobDto>), ApiError> {
    let job = state
        .job_service
        .create(payload.into(), Scope::Recruiter(user.id))
        .await?;
    Ok((StatusCode::CREATED, Json(job)))
}

async fn update_own_job(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<JobId>,
    ValidJson(payload): ValidJson<JobPayload>,
) -> Result<Json<JobDto>, ApiError> {
    Ok(Json(
        state
            .job_service
            .update(id, payload.into(), Scope::Recruiter(user.id))
            .await?,
    ))
}

async fn delete_own_job(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<JobId>,
) -> Result<Json<JobDto>, ApiError> {
    Ok(Json(
        state
            .job_service
            .delete(id, Scope::Recruiter(user.id))
            .await?,
    ))
}

async fn own_stats_by_level(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<LevelCountDto>>, ApiError> {
    Ok(Json(
        state
            .job_service
            .count_by_level(Scope::Recruiter(user.id))
            .await?,
    ))
}
