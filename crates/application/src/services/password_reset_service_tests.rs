//! 忘记密码流程测试

#[cfg(test)]
mod password_reset_service_tests {
    use domain::{DomainError, ROLE_USER};

    use crate::error::ApplicationError;
    use crate::memory::RecordingMailer;
    use crate::otp::{OtpStore, OTP_MAX_SENDS};
    use crate::services::fixture::Fixture;
    use crate::services::{DeviceInfo, LoginRequest, ResetPasswordRequest};

    /// OTP 邮件在后台任务中发送，让出调度直到邮件出现
    async fn wait_for_otp(mailer: &RecordingMailer, email: &str) -> Option<String> {
        for _ in 0..100 {
            if let Some(otp) = mailer.last_otp(email).await {
                return Some(otp);
            }
            tokio::task::yield_now().await;
        }
        None
    }

    #[tokio::test]
    async fn test_forgot_stores_otp_and_mails_it() {
        let fixture = Fixture::new().await;
        fixture.user("A", "a@example.com", ROLE_USER).await;

        let response = fixture.password_reset().forgot("a@example.com").await.unwrap();
        assert!(response.success);
        assert_eq!(response.expires_in, 300);
        assert_eq!(response.remaining_attempts, OTP_MAX_SENDS - 1);

        let stored = fixture.otp_store.get_otp("a@example.com").await.unwrap().unwrap();
        assert_eq!(stored.len(), 6);
        assert_eq!(
            wait_for_otp(&fixture.mailer, "a@example.com").await,
            Some(stored)
        );
    }

    #[tokio::test]
    async fn test_forgot_unknown_email_is_not_found() {
        let fixture = Fixture::new().await;
        let err = fixture
            .password_reset()
            .forgot("ghost@example.com")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::EntityNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_forgot_while_otp_is_live_is_rejected() {
        let fixture = Fixture::new().await;
        fixture.user("A", "a@example.com", ROLE_USER).await;
        let service = fixture.password_reset();
        service.forgot("a@example.com").await.unwrap();

        let err = service.forgot("a@example.com").await.unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::BusinessRule { .. })
        ));
    }

    #[tokio::test]
    async fn test_resend_is_rate_limited() {
        let fixture = Fixture::new().await;
        fixture.user("A", "a@example.com", ROLE_USER).await;
        let service = fixture.password_reset();

        service.forgot("a@example.com").await.unwrap();
        service.resend("a@example.com").await.unwrap();
        let last = service.resend("a@example.com").await.unwrap();
        assert_eq!(last.remaining_attempts, 0);

        let err = service.resend("a@example.com").await.unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::BusinessRule { .. })
        ));
    }

    #[tokio::test]
    async fn test_verify_reports_validity() {
        let fixture = Fixture::new().await;
        fixture.user("A", "a@example.com", ROLE_USER).await;
        let service = fixture.password_reset();
        service.forgot("a@example.com").await.unwrap();
        let otp = fixture.otp_store.get_otp("a@example.com").await.unwrap().unwrap();

        assert!(service.verify("a@example.com", &otp).await.unwrap().is_valid);
        assert!(!service.verify("a@example.com", "000000").await.unwrap().is_valid);
    }

    #[tokio::test]
    async fn test_reset_changes_password_and_consumes_otp() {
        let fixture = Fixture::new().await;
        fixture.user("A", "a@example.com", ROLE_USER).await;
        let service = fixture.password_reset();
        service.forgot("A@example.com").await.unwrap();
        let otp = fixture.otp_store.get_otp("a@example.com").await.unwrap().unwrap();

        service
            .reset(ResetPasswordRequest {
                email: "a@example.com".into(),
                otp: otp.clone(),
                new_password: "brand-new-pass".into(),
            })
            .await
            .unwrap();

        assert_eq!(fixture.otp_store.get_otp("a@example.com").await.unwrap(), None);
        assert_eq!(fixture.otp_store.send_attempts("a@example.com").await.unwrap(), 0);

        let login = fixture
            .auth()
            .login(LoginRequest {
                email: "a@example.com".into(),
                password: "brand-new-pass".into(),
                device: DeviceInfo::default(),
            })
            .await;
        assert!(login.is_ok());

        let err = service
            .reset(ResetPasswordRequest {
                email: "a@example.com".into(),
                otp,
                new_password: "again".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::BusinessRule { .. })
        ));
    }
}
