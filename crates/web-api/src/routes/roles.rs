//! 角色与权限管理
use application::{PermissionRequest, RoleRequest};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use domain::{Page, Permission, PermissionId, Role, RoleId};
use serde::Deserialize;
use validator::Validate;

use crate::error::ApiError;
use crate::extract::{PageQuery, ValidJson};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/roles", post(create_role).get(list_roles))
        .route(
            "/roles/{id}",
            get(get_role).put(update_role).delete(delete_role),
        )
        .route(
            "/permissions",
            post(create_permission).get(list_permissions),
        )
        .route("/permissions/all", get(list_all_permissions))
        .route(
            "/permissions/{id}",
            get(get_permission)
                .put(update_permission)
                .delete(delete_permission),
        )
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct RolePayload {
    #[validate(length(min = 1, max = 100))]
    name: String,
    description: Option<String>,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default)]
    permission_ids: Vec<PermissionId>,
}

fn default_active() -> bool {
    true
}

impl From<RolePayload> for RoleRequest {
    fn from(payload: RolePayload) -> Self {
        Self {
            name: payload.name,
            description: payload.description,
            active: payload.active,
            permission_ids: payload.permission_ids,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct PermissionPayload {
    #[validate(length(min = 1, max = 255))]
    name: String,
    #[validate(length(min = 1, max = 255))]
    api_path: String,
    #[validate(length(min = 1, max = 10))]
    method: String,
    #[validate(length(min = 1, max = 100))]
    module: String,
}

impl From<PermissionPayload> for PermissionRequest {
    fn from(payload: PermissionPayload) -> Self {
        Self {
            name: payload.name,
            api_path: payload.api_path,
            method: payload.method,
            module: payload.module,
        }
    }
}

async fn create_role(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RolePayload>,
) -> Result<(StatusCode, Json<Role>), ApiError> {
    let role = state.role_service.create_role(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

async fn list_roles(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<Role>>, ApiError> {
    Ok(Json(state.role_service.list_roles(page.request()).await?))
}

async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<RoleId>,
) -> Result<Json<Role>, ApiError> {
    Ok(Json(state.role_service.get_role(id).await?))
}

async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<RoleId>,
    ValidJson(payload): ValidJson<RolePayload>,
) -> Result<Json<Role>, ApiError> {
    Ok(Json(
        state.role_service.update_role(id, payload.into()).await?,
    ))
}

async fn delete_role(
    State(state): State<AppState>,
    Path(id): Path<RoleId>,
) -> Result<Json<Role>, ApiError> {
    Ok(Json(state.role_service.delete_role(id).await?))
}

async fn create_permission(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<PermissionPayload>,
) -> Result<(StatusCode, Json<Permission>), ApiError> {
    let permission = state
        .role_service
        .create_permission(payload.into())
        .await?;
    Ok((StatusCode::CREATED, Json(permission)))
}

async fn list_permissions(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<Permission>>, ApiError> {
    Ok(Json(
        state.role_service.list_permissions(page.request()).await?,
    ))
}

async fn list_all_permissions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Permission>>, ApiError> {
    Ok(Json(state.role_service.list_all_permissions().await?))
}

async fn get_permission(
    State(state): State<AppState>,
    Path(id): Path<PermissionId>,
) -> Result<Json<Permission>, ApiError> {
    Ok(Json(state.role_service.get_permission(id).await?))
}

async fn update_permission(
    State(state): State<AppState>,
    Path(id): Path<PermissionId>,
    ValidJson(payload): ValidJson<PermissionPayload>,
) -> Result<Json<Permission>, ApiError> {
    Ok(Json(
        state
            .role_service
            .update_permission(id, payload.into())
            .await?,
    ))
}

async fn delete_permission(
    State(state): State<AppState>,
    Path(id): Path<PermissionId>,
) -> Result<Json<Permission>, ApiError> {
    Ok(Json(state.role_service.delete_permission(id).await?))
}
