use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::{DomainError, RepositoryError};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn missing_cookie() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "MISSING_COOKIE",
            "refresh_token cookie is missing",
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "ACCESS_DENIED", message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.body.code
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        use ApplicationError as AppErr;

        match error {
            AppErr::Domain(DomainError::InvalidArgument { field, reason }) => {
                ApiError::validation(format!("{field}: {reason}"))
            }
            AppErr::Domain(err @ DomainError::EntityNotFound { .. }) => {
                ApiError::new(StatusCode::NOT_FOUND, "ENTITY_NOT_FOUND", err.to_string())
            }
            AppErr::Domain(err @ DomainError::EntityAlreadyExists { .. }) => ApiError::new(
                StatusCode::CONFLICT,
                "ENTITY_ALREADY_EXISTS",
                err.to_string(),
            ),
            AppErr::Domain(DomainError::AccessDenied { reason }) => ApiError::forbidden(reason),
            AppErr::Domain(DomainError::BusinessRule { reason }) => {
                ApiError::new(StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", reason)
            }
            AppErr::Repository(RepositoryError::NotFound) => ApiError::new(
                StatusCode::NOT_FOUND,
                "ENTITY_NOT_FOUND",
                "requested resource not found",
            ),
            AppErr::Repository(RepositoryError::Conflict) => ApiError::new(
                StatusCode::CONFLICT,
                "DATA_INTEGRITY_VIOLATION",
                "data integrity violation",
            ),
            AppErr::Conflict(message) => {
                ApiError::new(StatusCode::CONFLICT, "DATA_INTEGRITY_VIOLATION", message)
            }
            AppErr::Authentication => ApiError::new(
                StatusCode::UNAUTHORIZED,
                "BAD_CREDENTIALS",
                "email or password is incorrect",
            ),
            AppErr::InvalidToken => ApiError::unauthorized("invalid or expired token"),
            // 存储与外部服务的细节只写日志
            err @ (AppErr::Repository(RepositoryError::Storage { .. })
            | AppErr::Password(_)
            | AppErr::Infrastructure(_)) => {
                error!(error = %err, "请求处理失败");
                ApiError::internal_server_error("internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
