use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{JobId, PaymentId, Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    pub job_id: JobId,
    /// 金额，单位 VND
    pub amount: i64,
    pub order_id: String,
    pub transaction_no: Option<String>,
    pub order_info: String,
    pub status: PaymentStatus,
    pub paid_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Payment {
    pub fn pending(
        user_id: UserId,
        job_id: JobId,
        amount: i64,
        order_id: impl Into<String>,
        order_info: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: PaymentId::generate(),
            user_id,
            job_id,
            amount,
            order_id: order_id.into(),
            transaction_no: None,
            order_info: order_info.into(),
            status: PaymentStatus::Pending,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// PENDING → SUCCESS，只允许一次。
    pub fn mark_success(
        &mut self,
        transaction_no: impl Into<String>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.ensure_pending()?;
        self.status = PaymentStatus::Success;
        self.transaction_no = Some(transaction_no.into());
        self.paid_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// PENDING → FAILED，只允许一次。
    pub fn mark_failed(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.ensure_pending()?;
        self.status = PaymentStatus::Failed;
        self.updated_at = now;
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), DomainError> {
        if self.status != PaymentStatus::Pending {
            return Err(DomainError::business_rule(format!(
                "payment {} is already settled",
                self.order_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn payment_settles_only_once() {
        let now = Utc::now();
        let mut payment = Payment::pending(
            UserId::generate(),
            JobId::generate(),
            10_000,
            "abc",
            "info",
            now,
        );
        payment.mark_success("14000001", now).unwrap();
        assert_eq!(payment.status, PaymentStatus::Success);
        assert_eq!(payment.paid_at, Some(now));

        assert!(payment.mark_failed(now).is_err());
        assert!(payment.mark_success("14000002", now).is_err());
        assert_eq!(payment.transaction_no.as_deref(), Some("14000001"));
    }
}
