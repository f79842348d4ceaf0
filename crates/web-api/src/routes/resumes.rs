//! 简历投递
//!
//! 投递与替换文件走 multipart：`resume` 字段是 JSON 元数据，`pdfFile` 是 PDF 文件。

use application::dto::{ResumeDto, StatusCountDto};
use application::{ApplyRequest, Scope};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use domain::{JobId, Page, ResumeId, ResumeStatus, ROLE_ADMIN};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::{read_multipart, take_part, PageQuery, ValidJson};
use crate::state::AppState;

const RESUME_PART: &str = "resume";
const PDF_PART: &str = "pdfFile";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/resumes", post(apply).get(list_all))
        .route("/resumes/stats/status", get(stats_by_status))
        .route("/resumes/status", put(update_status))
        .route("/resumes/company", get(list_company))
        .route("/resumes/company/status", put(update_company_status))
        .route(
            "/resumes/company/stats/status",
            get(company_stats_by_status),
        )
        .route("/resumes/me", get(list_own))
        .route(
            "/resumes/me/jobs/{jobId}",
            get(has_applied).delete(withdraw),
        )
        .route("/resumes/me/file/{id}", put(replace_file))
        .route("/resumes/file/{id}", get(file_url))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ApplyPayload {
    #[validate(email)]
    email: String,
    job_id: JobId,
}

#[derive(Debug, Deserialize, Validate)]
struct StatusPayload {
    id: ResumeId,
    status: ResumeStatus,
}

#[derive(Debug, Serialize)]
struct FileUrlResponse {
    url: String,
}

#[derive(Debug, Serialize)]
struct AppliedResponse {
    applied: bool,
}

async fn apply(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeDto>), ApiError> {
    let mut parts = read_multipart(multipart).await?;
    let meta = take_part(&mut parts, RESUME_PART)?;
    let payload: ApplyPayload = serde_json::from_slice(&meta.bytes)
        .map_err(|err| ApiError::validation(format!("{RESUME_PART}: {err}")))?;
    payload
        .validate()
        .map_err(|errors| ApiError::validation(errors.to_string()))?;
    let pdf = take_part(&mut parts, PDF_PART)?;

    let resume = state
        .resume_service
        .apply(
            user.id,
            ApplyRequest {
                email: payload.email,
                job_id: payload.job_id,
                pdf: pdf.bytes,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(resume)))
}

async fn list_all(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<ResumeDto>>, ApiError> {
    Ok(Json(state.resume_service.list_all(page.request()).await?))
}

async fn list_company(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<ResumeDto>>, ApiError> {
    Ok(Json(
        state
            .resume_service
            .list_for_company(user.id, page.request())
            .await?,
    ))
}

async fn list_own(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<ResumeDto>>, ApiError> {
    Ok(Json(
        state
            .resume_service
            .list_self(user.id, page.request())
            .await?,
    ))
}

async fn has_applied(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(job_id): Path<JobId>,
) -> Result<Json<AppliedResponse>, ApiError> {
    let applied = state.resume_service.has_applied(user.id, job_id).await?;
    Ok(Json(AppliedResponse { applied }))
}

async fn withdraw(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(job_id): Path<JobId>,
) -> Result<StatusCode, ApiError> {
    state
        .resume_service
        .remove_self_by_job(user.id, job_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn replace_file(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<ResumeId>,
    multipart: Multipart,
) -> Result<Json<ResumeDto>, ApiError> {
    let mut parts = read_multipart(multipart).await?;
    let pdf = take_part(&mut parts, PDF_PART)?;
    Ok(Json(
        state
            .resume_service
            .replace_self_file(user.id, id, pdf.bytes)
            .await?,
    ))
}

async fn file_url(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<ResumeId>,
) -> Result<Json<FileUrlResponse>, ApiError> {
    let url = state
        .resume_service
        .file_url(user.id, user.has_role(ROLE_ADMIN), id)
        .await?;
    Ok(Json(FileUrlResponse { url }))
}

async fn update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidJson(payload): ValidJson<StatusPayload>,
) -> Result<Json<ResumeDto>, ApiError> {
    Ok(Json(
        state
            .resume_service
            .update_status(user.id, payload.id, payload.status, Scope::Admin)
            .await?,
    ))
}

async fn update_company_status(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidJson(payload): ValidJson<StatusPayload>,
) -> Result<Json<ResumeDto>, ApiError> {
    Ok(Json(
        state
            .resume_service
            .update_status(
                user.id,
                payload.id,
                payload.status,
                Scope::Recruiter(user.id),
            )
            .await?,
    ))
}

async fn stats_by_status(
    State(state): State<AppState>,
) -> Result<Json<Vec<StatusCountDto>>, ApiError> {
    Ok(Json(
        state.resume_service.count_by_status(Scope::Admin).await?,
    ))
}

async fn company_stats_by_status(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<StatusCountDto>>, ApiError> {
    Ok(Json(
        state
            .resume_service
            .count_by_status(Scope::Recruiter(user.id))
            .await?,
    ))
}
