use application::PaymentRepository;
use async_trait::async_trait;
use domain::{JobId, Payment, PaymentId, PaymentStatus, RepositoryError, Timestamp, UserId};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::map_sqlx_err;

#[derive(Debug, FromRow)]
struct PaymentRecord {
    id: Uuid,
    user_id: Uuid,
    job_id: Uuid,
    amount: i64,
    order_id: String,
    transaction_no: Option<String>,
    order_info: String,
    status: PaymentStatus,
    paid_at: Option<Timestamp>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl From<PaymentRecord> for Payment {
    fn from(value: PaymentRecord) -> Self {
        Payment {
            id: PaymentId::from(value.id),
            user_id: UserId::from(value.user_id),
            job_id: JobId::from(value.job_id),
            amount: value.amount,
            order_id: value.order_id,
            transaction_no: value.transaction_no,
            order_info: value.order_info,
            status: value.status,
            paid_at: value.paid_at,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn create(&self, payment: Payment) -> Result<Payment, RepositoryError> {
        let record = sqlx::query_as::<_, PaymentRecord>(
            r#"
            INSERT INTO payments (id, user_id, job_id, amount, order_id, transaction_no,
                                  order_info, status, paid_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, user_id, job_id, amount, order_id, transaction_no, order_info,
                      status, paid_at, created_at, updated_at
            "#,
        )
        .bind(payment.id.0)
        .bind(payment.user_id.0)
        .bind(payment.job_id.0)
        .bind(payment.amount)
        .bind(&payment.order_id)
        .bind(&payment.transaction_no)
        .bind(&payment.order_info)
        .bind(payment.status)
        .bind(payment.paid_at)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.into())
    }

    async fn update(&self, payment: Payment) -> Result<Payment, RepositoryError> {
        let record = sqlx::query_as::<_, PaymentRecord>(
            r#"
            UPDATE payments
            SET transaction_no = $2, status = $3, paid_at = $4, updated_at = $5
            WHERE id = $1
            RETURNING id, user_id, job_id, amount, order_id, transaction_no, order_info,
                      status, paid_at, created_at, updated_at
            "#,
        )
        .bind(payment.id.0)
        .bind(&payment.transaction_no)
        .bind(payment.status)
        .bind(payment.paid_at)
        .bind(payment.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(record.into())
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Payment>, RepositoryError> {
        let record = sqlx::query_as::<_, PaymentRecord>(
            r#"
            SELECT id, user_id, job_id, amount, order_id, transaction_no, order_info,
                   status, paid_at, created_at, updated_at
            FROM payments WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Payment::from))
    }

    async fn has_successful_payment(
        &self,
        user_id: UserId,
        job_id: JobId,
    ) -> Result<bool, RepositoryError> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM payments
                WHERE user_id = $1 AND job_id = $2 AND status = 'SUCCESS'
            )
            "#,
        )
        .bind(user_id.0)
        .bind(job_id.0)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)
    }
}
