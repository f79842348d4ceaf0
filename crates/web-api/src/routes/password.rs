use application::dto::{OtpResponseDto, ResetPasswordResponseDto, VerifyOtpResponseDto};
use application::ResetPasswordRequest;
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use validator::Validate;

use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/password/forgot", post(forgot))
        .route("/auth/password/resend-otp", post(resend_otp))
        .route("/auth/password/verify-otp", post(verify_otp))
        .route("/auth/password/reset", post(reset))
}

#[derive(Debug, Deserialize, Validate)]
struct EmailPayload {
    #[validate(email)]
    email: String,
}

#[derive(Debug, Deserialize, Validate)]
struct VerifyOtpPayload {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1))]
    otp: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ResetPayload {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1))]
    otp: String,
    #[validate(length(min = 6, max = 100))]
    new_password: String,
}

async fn forgot(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<EmailPayload>,
) -> Result<Json<OtpResponseDto>, ApiError> {
    Ok(Json(
        state.password_reset_service.forgot(&payload.email).await?,
    ))
}

async fn resend_otp(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<EmailPayload>,
) -> Result<Json<OtpResponseDto>, ApiError> {
    Ok(Json(
        state.password_reset_service.resend(&payload.email).await?,
    ))
}

async fn verify_otp(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<VerifyOtpPayload>,
) -> Result<Json<VerifyOtpResponseDto>, ApiError> {
    Ok(Json(
        state
            .password_reset_service
            .verify(&payload.email, &payload.otp)
            .await?,
    ))
}

async fn reset(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<ResetPayload>,
) -> Result<Json<ResetPasswordResponseDto>, ApiError> {
    let response = state
        .password_reset_service
        .reset(ResetPasswordRequest {
            email: payload.email,
            otp: payload.otp,
            new_password: payload.new_password,
        })
        .await?;
    Ok(Json(response))
}
