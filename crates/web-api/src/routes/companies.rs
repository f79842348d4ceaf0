use application::dto::{CompanyMemberDto, CompanyWithJobsDto};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use domain::{Company, CompanyDetails, CompanyId, Page};
use serde::Deserialize;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::{read_multipart, take_part, PageQuery, UploadedPart, ValidJson};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/companies", post(create_company).get(list_companies))
        .route("/companies/with-jobs-count", get(list_with_jobs_count))
        .route(
            "/companies/{id}",
            get(get_company).put(update_company).delete(delete_company),
        )
        .route("/companies/{id}/logo", post(upload_logo))
        .route(
            "/companies/me",
            get(get_own_company)
                .post(create_own_company)
                .put(update_own_company),
        )
        .route("/companies/me/logo", post(upload_own_logo))
        .route(
            "/companies/me/members",
            get(list_members).post(add_member),
        )
        .route("/companies/me/members/{email}", delete(remove_member))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CompanyPayload {
    #[validate(length(min = 1, max = 255))]
    name: String,
    description: Option<String>,
    address: Option<String>,
}

impl From<CompanyPayload> for CompanyDetails {
    fn from(payload: CompanyPayload) -> Self {
        Self {
            name: payload.name,
            description: payload.description,
            address: payload.address,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
struct MemberPayload {
    #[validate(email)]
    email: String,
}

#[derive(Debug, Deserialize)]
struct CompanyListQuery {
    page: Option<u32>,
    size: Option<u32>,
    name: Option<String>,
}

async fn logo_part(multipart: Multipart) -> Result<UploadedPart, ApiError> {
    let mut parts = read_multipart(multipart).await?;
    take_part(&mut parts, "logo")
}

async fn create_company(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CompanyPayload>,
) -> Result<(StatusCode, Json<Company>), ApiError> {
    let company = state.company_service.create(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

async fn list_companies(
    State(state): State<AppState>,
    Query(query): Query<CompanyListQuery>,
) -> Result<Json<Page<Company>>, ApiError> {
    Ok(Json(
        state
            .company_service
            .list(
                query.name.as_deref(),
                PageQuery::new(query.page, query.size).request(),
            )
            .await?,
    ))
}

async fn list_with_jobs_count(
    State(state): State<AppState>,
) -> Result<Json<Vec<CompanyWithJobsDto>>, ApiError> {
    Ok(Json(state.company_service.list_with_job_counts().await?))
}

async fn get_company(
    State(state): State<AppState>,
    Path(id): Path<CompanyId>,
) -> Result<Json<Company>, ApiError> {
    Ok(Json(state.company_service.get(id).await?))
}

async fn update_company(
    State(state): State<AppState>,
    Path(id): Path<CompanyId>,
    ValidJson(payload): ValidJson<CompanyPayload>,
) -> Result<Json<Company>, ApiError> {
    Ok(Json(
        state.company_service.update(id, payload.into()).await?,
    ))
}

async fn delete_company(
    State(state): State<AppState>,
    Path(id): Path<CompanyId>,
) -> Result<Json<Company>, ApiError> {
    Ok(Json(state.company_service.delete(id).await?))
}

async fn upload_logo(
    State(state): State<AppState>,
    Path(id): Path<CompanyId>,
    multipart: Multipart,
) -> Result<Json<Company>, ApiError> {
    let logo = logo_part(multipart).await?;
    Ok(Json(
        state
            .company_service
            .upload_logo(id, logo.bytes, logo.filename.as_deref())
            .await?,
    ))
}

async fn get_own_company(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Company>, ApiError> {
    Ok(Json(state.company_service.get_self(user.id).await?))
}

async fn create_own_company(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidJson(payload): ValidJson<CompanyPayload>,
) -> Result<(StatusCode, Json<Company>), ApiError> {
    let company = state
        .company_service
        .create_self(user.id, payload.into())
        .await?;
    Ok((StatusCode::CREATED, Json(company)))
}

async fn update_own_company(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidJson(payload): ValidJson<CompanyPayload>,
) -> Result<Json<Company>, ApiError> {
    Ok(Json(
        state
            .company_service
            .update_self(user.id, payload.into())
            .await?,
    ))
}

async fn upload_own_logo(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<Json<Company>, ApiError> {
    let logo = logo_part(multipart).await?;
    Ok(Json(
        state
            .company_service
            .upload_self_logo(user.id, logo.bytes, logo.filename.as_deref())
            .await?,
    ))
}

async fn list_members(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<CompanyMemberDto>>, ApiError> {
    Ok(Json(state.company_service.list_members(user.id).await?))
}

async fn add_member(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidJson(payload): ValidJson<MemberPayload>,
) -> Result<Json<CompanyMemberDto>, ApiError> {
    Ok(Json(
        state
            .company_service
            .add_member(user.id, &payload.email)
            .await?,
    ))
}

async fn remove_member(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(email): Path<String>,
) -> Result<Json<CompanyMemberDto>, ApiError> {
    Ok(Json(
        state
            .company_service
            .remove_member(user.id, &email)
            .await?,
    ))
}
