//! 支付服务测试

#[cfg(test)]
mod payment_service_tests {
    use std::collections::BTreeMap;

    use domain::{DomainError, PaymentStatus, Resume, ResumeId, ROLE_USER};

    use crate::error::ApplicationError;
    use crate::repository::{PaymentRepository, ResumeRepository};
    use crate::services::fixture::{now, vnpay_config, Fixture};
    use crate::services::vnpay::{VnPaySigner, RESPONSE_OK, SECURE_HASH};
    use crate::services::PAYMENT_AMOUNT;

    /// 模拟 VNPay 回跳参数，值只含字母数字，无需编码
    fn callback(order_id: &str, code: &str) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("vnp_Amount".to_string(), (PAYMENT_AMOUNT * 100).to_string());
        params.insert("vnp_ResponseCode".to_string(), code.to_string());
        params.insert("vnp_TransactionNo".to_string(), "14422574".to_string());
        params.insert("vnp_TxnRef".to_string(), order_id.to_string());
        let data = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let hash = VnPaySigner::new(&vnpay_config()).sign(&data).unwrap();
        params.insert(SECURE_HASH.to_string(), hash);
        params
    }

    #[tokio::test]
    async fn test_create_stores_pending_payment() {
        let fixture = Fixture::new().await;
        let user = fixture.user("A", "a@example.com", ROLE_USER).await;
        let job = fixture.job("Backend", None, vec![]).await;

        let created = fixture.payments().create(job.id, user.id).await.unwrap();

        assert_eq!(created.order_id.len(), 20);
        assert!(created
            .payment_url
            .starts_with("https://sandbox.vnpayment.vn/paymentv2/vpcpay.html?"));
        assert!(created.payment_url.contains("vnp_Amount=1000000"));
        assert!(created.payment_url.contains(SECURE_HASH));

        let payment = PaymentRepository::find_by_order_id(fixture.db.as_ref(), &created.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount, PAYMENT_AMOUNT);
    }

    #[tokio::test]
    async fn test_create_for_unknown_job() {
        let fixture = Fixture::new().await;
        let user = fixture.user("A", "a@example.com", ROLE_USER).await;
        let err = fixture
            .payments()
            .create(domain::JobId::generate(), user.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::EntityNotFound { entity: "job", .. })
        ));
    }

    #[tokio::test]
    async fn test_successful_return_unlocks_applicant_count() {
        let fixture = Fixture::new().await;
        let payer = fixture.user("Payer", "payer@example.com", ROLE_USER).await;
        let applicant = fixture.user("Applicant", "app@example.com", ROLE_USER).await;
        let job = fixture.job("Backend", None, vec![]).await;
        ResumeRepository::create(
            fixture.db.as_ref(),
            Resume::submit(ResumeId::generate(), applicant.email.clone(), applicant.id, job.id, now()),
        )
        .await
        .unwrap();
        let service = fixture.payments();

        let before = service.check(job.id, payer.id).await.unwrap();
        assert!(!before.paid);
        assert_eq!(before.applicant_count, None);

        let created = service.create(job.id, payer.id).await.unwrap();
        let job_id = service
            .handle_return(&callback(&created.order_id, RESPONSE_OK))
            .await
            .unwrap();
        assert_eq!(job_id, Some(job.id));

        let payment = PaymentRepository::find_by_order_id(fixture.db.as_ref(), &created.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Success);
        assert_eq!(payment.transaction_no.as_deref(), Some("14422574"));
        assert_eq!(payment.paid_at, Some(now()));

        let after = service.check(job.id, payer.id).await.unwrap();
        assert!(after.paid);
        assert_eq!(after.applicant_count, Some(1));
        assert_eq!(after.job_name, "Backend");

        // 已付款后不能重复下单
        let err = service.create(job.id, payer.id).await.unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::BusinessRule { .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_callback_is_idempotent() {
        let fixture = Fixture::new().await;
        let payer = fixture.user("Payer", "payer@example.com", ROLE_USER).await;
        let job = fixture.job("Backend", None, vec![]).await;
        let service = fixture.payments();
        let created = service.create(job.id, payer.id).await.unwrap();
        let params = callback(&created.order_id, RESPONSE_OK);

        assert_eq!(service.handle_return(&params).await.unwrap(), Some(job.id));
        assert_eq!(service.handle_return(&params).await.unwrap(), Some(job.id));
    }

    #[tokio::test]
    async fn test_failed_return_marks_payment_failed() {
        let fixture = Fixture::new().await;
        let payer = fixture.user("Payer", "payer@example.com", ROLE_USER).await;
        let job = fixture.job("Backend", None, vec![]).await;
        let service = fixture.payments();
        let created = service.create(job.id, payer.id).await.unwrap();

        let result = service
            .handle_return(&callback(&created.order_id, "24"))
            .await
            .unwrap();
        assert_eq!(result, None);

        let payment = PaymentRepository::find_by_order_id(fixture.db.as_ref(), &created.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert!(!service.check(job.id, payer.id).await.unwrap().paid);

        // 失败后再次回调成功也不会改变已结算的订单
        let result = service
            .handle_return(&callback(&created.order_id, RESPONSE_OK))
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_tampered_or_unknown_callback_is_ignored() {
        let fixture = Fixture::new().await;
        let payer = fixture.user("Payer", "payer@example.com", ROLE_USER).await;
        let job = fixture.job("Backend", None, vec![]).await;
        let service = fixture.payments();
        let created = service.create(job.id, payer.id).await.unwrap();

        let mut tampered = callback(&created.order_id, RESPONSE_OK);
        tampered.insert("vnp_Amount".to_string(), "100".to_string());
        assert_eq!(service.handle_return(&tampered).await.unwrap(), None);
        let payment = PaymentRepository::find_by_order_id(fixture.db.as_ref(), &created.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);

        let unknown = callback("nosuchorder", RESPONSE_OK);
        assert_eq!(service.handle_return(&unknown).await.unwrap(), None);

        let mut unsigned = callback(&created.order_id, RESPONSE_OK);
        unsigned.remove(SECURE_HASH);
        assert_eq!(service.handle_return(&unsigned).await.unwrap(), None);
    }
}
