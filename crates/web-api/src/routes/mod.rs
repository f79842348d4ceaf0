//! HTTP 路由装配
//!
//! 业务接口全部挂在 `/api/v1` 下，统一经过 [`crate::access::authorize`]。

mod auth;
mod chat;
mod companies;
mod jobs;
mod notifications;
mod password;
mod payments;
mod resumes;
mod roles;
mod skills;
mod subscribers;
mod users;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::warn;

use crate::access::{authorize, API_PREFIX};
use crate::state::AppState;

/// 简历、头像、Logo 上传上限
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth::routes())
        .merge(password::routes())
        .merge(users::routes())
        .merge(roles::routes())
        .merge(companies::routes())
        .merge(skills::routes())
        .merge(jobs::routes())
        .merge(resumes::routes())
        .merge(notifications::routes())
        .merge(payments::routes())
        .merge(chat::routes())
        .merge(subscribers::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), authorize))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    let mut router = Router::new()
        .route("/health", get(health))
        .nest(API_PREFIX, api);

    if let Some(dir) = &state.settings.files_dir {
        router = router.nest_service("/files", ServeDir::new(dir));
    }

    router
        .layer(cors_layer(&state.settings.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "忽略无效的 CORS 来源");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn health() -> StatusCode {
    StatusCode::OK
}
