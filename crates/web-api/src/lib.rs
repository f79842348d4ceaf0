//! Web API 层。
//!
//! 提供 Axum 路由，将 HTTP 请求委托给应用层的用例服务。
//! 鉴权按路由模板匹配权限串，见 [`access`]。

pub mod access;
mod auth;
mod error;
mod extract;
mod routes;
mod state;

pub use auth::{CurrentUser, JwtService, REFRESH_COOKIE};
pub use config::JwtConfig;
pub use error::ApiError;
pub use routes::{router, MAX_UPLOAD_BYTES};
pub use state::{AppState, HttpSettings};
