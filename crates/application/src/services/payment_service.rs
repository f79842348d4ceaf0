use std::collections::BTreeMap;
use std::sync::Arc;

use domain::{JobId, Payment, PaymentStatus, UserId};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    clock::Clock,
    dto::{PaymentCreatedDto, PaymentStatusDto},
    error::ApplicationError,
    repository::{JobRepository, PaymentRepository, ResumeRepository, UserRepository},
};

use super::require_user;
use super::vnpay::{VnPaySigner, RESPONSE_OK};

/// 查看投递人数的费用，单位 VND
pub const PAYMENT_AMOUNT: i64 = 10_000;

const ORDER_ID_LEN: usize = 20;

pub struct PaymentServiceDependencies {
    pub payment_repository: Arc<dyn PaymentRepository>,
    pub job_repository: Arc<dyn JobRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub resume_repository: Arc<dyn ResumeRepository>,
    pub signer: VnPaySigner,
    pub clock: Arc<dyn Clock>,
}

/// 付费查看职位投递人数
pub struct PaymentService {
    deps: PaymentServiceDependencies,
}

impl PaymentService {
    pub fn new(deps: PaymentServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn create(
        &self,
        job_id: JobId,
        user_id: UserId,
    ) -> Result<PaymentCreatedDto, ApplicationError> {
        self.deps
            .job_repository
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("job", job_id))?;
        require_user(self.deps.user_repository.as_ref(), user_id).await?;

        if self
            .deps
            .payment_repository
            .has_successful_payment(user_id, job_id)
            .await?
        {
            return Err(ApplicationError::business_rule(
                "you have already paid for this job",
            ));
        }

        let order_id: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(ORDER_ID_LEN)
            .collect();
        let order_info = format!("Thanh toan xem so nguoi ung tuyen job {job_id}");
        let now = self.deps.clock.now();
        let payment_url =
            self.deps
                .signer
                .payment_url(&order_id, &order_info, PAYMENT_AMOUNT, now)?;

        let payment = Payment::pending(user_id, job_id, PAYMENT_AMOUNT, &order_id, order_info, now);
        self.deps.payment_repository.create(payment).await?;
        info!(order_id = %order_id, job_id = %job_id, user_id = %user_id, "创建支付订单");

        Ok(PaymentCreatedDto {
            payment_url,
            order_id,
        })
    }

    /// 处理 VNPay 回跳，支付成功时返回对应职位
    pub async fn handle_return(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<Option<JobId>, ApplicationError> {
        if !self.deps.signer.verify(params) {
            warn!("VNPay 回调签名校验失败");
            return Ok(None);
        }
        let Some(order_id) = params.get("vnp_TxnRef") else {
            return Ok(None);
        };
        let Some(mut payment) = self
            .deps
            .payment_repository
            .find_by_order_id(order_id)
            .await?
        else {
            warn!(order_id = %order_id, "VNPay 回调订单不存在");
            return Ok(None);
        };

        if payment.status != PaymentStatus::Pending {
            info!(order_id = %order_id, status = ?payment.status, "订单已结算，忽略重复回调");
            return Ok((payment.status == PaymentStatus::Success).then_some(payment.job_id));
        }

        let now = self.deps.clock.now();
        let code = params.get("vnp_ResponseCode").map(String::as_str);
        if code == Some(RESPONSE_OK) {
            let transaction_no = params
                .get("vnp_TransactionNo")
                .cloned()
                .unwrap_or_default();
            payment.mark_success(transaction_no, now)?;
            let payment = self.deps.payment_repository.update(payment).await?;
            info!(order_id = %order_id, job_id = %payment.job_id, "支付成功");
            Ok(Some(payment.job_id))
        } else {
            payment.mark_failed(now)?;
            self.deps.payment_repository.update(payment).await?;
            info!(order_id = %order_id, code = ?code, "支付失败");
            Ok(None)
        }
    }

    pub async fn check(
        &self,
        job_id: JobId,
        user_id: UserId,
    ) -> Result<PaymentStatusDto, ApplicationError> {
        let job = self
            .deps
            .job_repository
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("job", job_id))?;
        let paid = self
            .deps
            .payment_repository
            .has_successful_payment(user_id, job_id)
            .await?;
        let applicant_count = if paid {
            Some(self.deps.resume_repository.count_by_job(job_id).await?)
        } else {
            None
        };

        Ok(PaymentStatusDto {
            paid,
            applicant_count,
            job_name: job.name,
        })
    }
}
