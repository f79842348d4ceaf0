//! VNPay 支付
//!
//! 网关回调 `vnpay-return` 只做重定向，结果通过前端页面展示。

use std::collections::BTreeMap;

use application::dto::{PaymentCreatedDto, PaymentStatusDto};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use domain::JobId;
use serde::Deserialize;
use tracing::info;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments/create", post(create_payment))
        .route("/payments/vnpay-return", get(vnpay_return))
        .route("/payments/check/{jobId}", get(check_payment))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentPayload {
    job_id: JobId,
}

async fn create_payment(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreatePaymentPayload>,
) -> Result<Json<PaymentCreatedDto>, ApiError> {
    Ok(Json(
        state
            .payment_service
            .create(payload.job_id, user.id)
            .await?,
    ))
}

async fn vnpay_return(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let frontend = state.settings.frontend_url.trim_end_matches('/');
    let location = match state.payment_service.handle_return(&params).await? {
        Some(job_id) => format!("{frontend}/jobs/{job_id}?paymentSuccess=true"),
        None => {
            let order_id = params.get("vnp_TxnRef").map(String::as_str).unwrap_or_default();
            info!(order_id, "支付未成功，重定向到结果页");
            format!("{frontend}/payment/result?success=false&orderId={order_id}")
        }
    };

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]))
}

async fn check_payment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(job_id): Path<JobId>,
) -> Result<Json<PaymentStatusDto>, ApiError> {
    Ok(Json(state.payment_service.check(job_id, user.id).await?))
}
