use application::dto::{Assignment, UserDto};
use application::{CreateUserRequest, UpdateUserRequest, UserFilter};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use domain::{CompanyId, Gender, Page, RoleId, UserId, UserProfile};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::{read_multipart, take_part, PageQuery, ValidJson};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/me/profile", put(update_profile))
        .route("/users/me/password", put(change_password))
        .route("/users/me/avatar", post(upload_avatar))
}

/// 解除关联时传入的占位 id
const DETACH_IDS: [&str; 2] = ["-1", "detach"];

fn assignment<T: From<Uuid>>(field: &str, raw: Option<&str>) -> Result<Assignment<T>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Assignment::Keep),
        Some(value) if DETACH_IDS.contains(&value) => Ok(Assignment::Clear),
        Some(value) => Uuid::parse_str(value)
            .map(|id| Assignment::Set(T::from(id)))
            .map_err(|_| ApiError::validation(format!("{field}: invalid id {value}"))),
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateUserPayload {
    #[validate(length(min = 1, max = 255))]
    name: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 6, max = 100))]
    password: String,
    dob: Option<NaiveDate>,
    address: Option<String>,
    gender: Option<Gender>,
    company_id: Option<CompanyId>,
    role_id: Option<RoleId>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateUserPayload {
    #[validate(length(min = 1, max = 255))]
    name: String,
    dob: Option<NaiveDate>,
    address: Option<String>,
    gender: Option<Gender>,
    company_id: Option<String>,
    role_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ProfilePayload {
    #[validate(length(min = 1, max = 255))]
    name: String,
    dob: Option<NaiveDate>,
    address: Option<String>,
    gender: Option<Gender>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct PasswordPayload {
    #[validate(length(min = 1))]
    old_password: String,
    #[validate(length(min = 6, max = 100))]
    new_password: String,
}

#[derive(Debug, Deserialize)]
struct UserListQuery {
    page: Option<u32>,
    size: Option<u32>,
    name: Option<String>,
    email: Option<String>,
}

async fn create_user(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CreateUserPayload>,
) -> Result<(StatusCode, Json<UserDto>), ApiError> {
    let user = state
        .user_service
        .create(CreateUserRequest {
            name: payload.name,
            email: payload.email,
            password: payload.password,
            dob: payload.dob,
            address: payload.address,
            gender: payload.gender,
            company_id: payload.company_id,
            role_id: payload.role_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Page<UserDto>>, ApiError> {
    let filter = UserFilter {
        name: query.name,
        email: query.email,
    };
    Ok(Json(
        state
            .user_service
            .list(filter, PageQuery::new(query.page, query.size).request())
            .await?,
    ))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<UserDto>, ApiError> {
    Ok(Json(state.user_service.get(id).await?))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    ValidJson(payload): ValidJson<UpdateUserPayload>,
) -> Result<Json<UserDto>, ApiError> {
    let request = UpdateUserRequest {
        id,
        profile: UserProfile {
            name: payload.name,
            dob: payload.dob,
            address: payload.address,
            gender: payload.gender,
        },
        company: assignment::<CompanyId>("companyId", payload.company_id.as_deref())?,
        role: assignment::<RoleId>("roleId", payload.role_id.as_deref())?,
    };
    Ok(Json(state.user_service.update(request).await?))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<UserDto>, ApiError> {
    Ok(Json(state.user_service.delete(id).await?))
}

async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidJson(payload): ValidJson<ProfilePayload>,
) -> Result<Json<UserDto>, ApiError> {
    let profile = UserProfile {
        name: payload.name,
        dob: payload.dob,
        address: payload.address,
        gender: payload.gender,
    };
    Ok(Json(
        state
            .user_service
            .update_self_profile(user.id, profile)
            .await?,
    ))
}

async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidJson(payload): ValidJson<PasswordPayload>,
) -> Result<Json<UserDto>, ApiError> {
    Ok(Json(
        state
            .user_service
            .change_self_password(user.id, &payload.old_password, &payload.new_password)
            .await?,
    ))
}

async fn upload_avatar(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<Json<UserDto>, ApiError> {
    let mut parts = read_multipart(multipart).await?;
    let avatar = take_part(&mut parts, "avatar")?;
    Ok(Json(
        state
            .user_service
            .update_self_avatar(user.id, avatar.bytes, avatar.filename.as_deref())
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_parsing() {
        assert_eq!(
            assignment::<CompanyId>("companyId", None).unwrap(),
            Assignment::Keep
        );
        assert_eq!(
            assignment::<CompanyId>("companyId", Some("-1")).unwrap(),
            Assignment::Clear
        );
        let id = Uuid::new_v4();
        assert_eq!(
            assignment::<RoleId>("roleId", Some(&id.to_string())).unwrap(),
            Assignment::Set(RoleId(id))
        );
        assert!(assignment::<RoleId>("roleId", Some("abc")).is_err());
    }
}
