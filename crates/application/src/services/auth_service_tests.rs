//! 认证服务单元测试
//!
//! 覆盖注册、登录、刷新令牌轮换、登出以及多设备会话管理。

#[cfg(test)]
mod auth_service_tests {
    use domain::{DomainError, ROLE_RECRUITER, ROLE_USER};

    use crate::error::ApplicationError;
    use crate::services::fixture::{Fixture, PASSWORD};
    use crate::services::{DeviceInfo, LoginRequest, RegisterRequest};

    fn register_request(email: &str, recruiter: bool) -> RegisterRequest {
        RegisterRequest {
            name: "Nguyễn Văn A".to_string(),
            email: email.to_string(),
            password: PASSWORD.to_string(),
            dob: None,
            address: None,
            gender: None,
            recruiter,
        }
    }

    fn login_request(email: &str, password: &str, device: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            device: DeviceInfo {
                device_name: device.to_string(),
                device_type: "desktop".to_string(),
                user_agent: "test-agent".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_register_assigns_user_role() {
        let fixture = Fixture::new().await;
        let user = fixture
            .auth()
            .register(register_request("a@example.com", false))
            .await
            .unwrap();

        assert_eq!(user.email, "a@example.com");
        assert_eq!(user.role.as_deref(), Some(ROLE_USER));
    }

    #[tokio::test]
    async fn test_register_recruiter_flag_assigns_recruiter_role() {
        let fixture = Fixture::new().await;
        let user = fixture
            .auth()
            .register(register_request("hr@example.com", true))
            .await
            .unwrap();

        assert_eq!(user.role.as_deref(), Some(ROLE_RECRUITER));
    }

    #[tokio::test]
    async fn test_register_duplicate_email_is_rejected() {
        let fixture = Fixture::new().await;
        let auth = fixture.auth();
        auth.register(register_request("dup@example.com", false))
            .await
            .unwrap();

        let err = auth
            .register(register_request("DUP@example.com", false))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::EntityAlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_login_with_wrong_password_fails() {
        let fixture = Fixture::new().await;
        fixture.user("A", "a@example.com", ROLE_USER).await;

        let err = fixture
            .auth()
            .login(login_request("a@example.com", "wrong-password", "laptop"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Authentication));

        let err = fixture
            .auth()
            .login(login_request("nobody@example.com", PASSWORD, "laptop"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Authentication));
    }

    #[tokio::test]
    async fn test_login_issues_tokens_and_records_session() {
        let fixture = Fixture::new().await;
        fixture.user("A", "a@example.com", ROLE_USER).await;
        let auth = fixture.auth();

        let result = auth
            .login(login_request("a@example.com", PASSWORD, "laptop"))
            .await
            .unwrap();
        assert!(!result.body.access_token.is_empty());
        assert_ne!(result.body.access_token, result.refresh_token);
        assert_eq!(result.body.user.email, "a@example.com");

        let sessions = auth.sessions(&result.refresh_token).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert!(sessions[0].current);
        assert_eq!(sessions[0].device_name, "laptop");
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let fixture = Fixture::new().await;
        fixture.user("A", "a@example.com", ROLE_USER).await;
        let auth = fixture.auth();
        let first = auth
            .login(login_request("a@example.com", PASSWORD, "laptop"))
            .await
            .unwrap();

        let second = auth
            .refresh(&first.refresh_token, DeviceInfo::default())
            .await
            .unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);

        // 旧令牌已从会话存储中移除
        let err = auth
            .refresh(&first.refresh_token, DeviceInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidToken));
    }

    #[tokio::test]
    async fn test_refresh_with_revoked_token_is_invalid() {
        let fixture = Fixture::new().await;
        fixture.user("A", "a@example.com", ROLE_USER).await;
        let auth = fixture.auth();
        let result = auth
            .login(login_request("a@example.com", PASSWORD, "laptop"))
            .await
            .unwrap();

        fixture.tokens.revoke(&result.refresh_token);
        let err = auth
            .refresh(&result.refresh_token, DeviceInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidToken));
    }

    #[tokio::test]
    async fn test_logout_removes_only_current_session() {
        let fixture = Fixture::new().await;
        fixture.user("A", "a@example.com", ROLE_USER).await;
        let auth = fixture.auth();
        let laptop = auth
            .login(login_request("a@example.com", PASSWORD, "laptop"))
            .await
            .unwrap();
        let phone = auth
            .login(login_request("a@example.com", PASSWORD, "phone"))
            .await
            .unwrap();

        auth.logout(Some(&laptop.refresh_token)).await.unwrap();
        auth.logout(None).await.unwrap();

        let sessions = auth.sessions(&phone.refresh_token).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].device_name, "phone");
    }

    #[tokio::test]
    async fn test_remove_session_of_another_user_is_denied() {
        let fixture = Fixture::new().await;
        fixture.user("A", "a@example.com", ROLE_USER).await;
        let other = fixture.user("B", "b@example.com", ROLE_USER).await;
        let auth = fixture.auth();
        let result = auth
            .login(login_request("a@example.com", PASSWORD, "laptop"))
            .await
            .unwrap();
        let session_id = auth.sessions(&result.refresh_token).await.unwrap()[0]
            .session_id
            .clone();

        let err = auth.remove_session(other.id, &session_id).await.unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::AccessDenied { .. })
        ));

        auth.remove_session(result.body.user.id, &session_id)
            .await
            .unwrap();
        let err = auth
            .refresh(&result.refresh_token, DeviceInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidToken));
    }

    #[tokio::test]
    async fn test_me_returns_role_and_permissions() {
        let fixture = Fixture::new().await;
        let user = fixture.user("A", "a@example.com", ROLE_USER).await;

        let me = fixture.auth().me(user.id).await.unwrap();
        assert_eq!(me.id, user.id);
        assert_eq!(me.role.as_deref(), Some(ROLE_USER));
        assert!(me.permissions.is_empty());

        let details = fixture.auth().me_details(user.id).await.unwrap();
        assert_eq!(details.email, "a@example.com");
    }
}
