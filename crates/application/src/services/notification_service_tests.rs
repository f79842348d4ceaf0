//! 站内通知测试

#[cfg(test)]
mod notification_service_tests {
    use domain::{
        Company, DomainError, NotificationId, NotificationType, PageRequest, Resume, ResumeId,
        ResumeStatus, ROLE_ADMIN, ROLE_USER,
    };

    use crate::error::ApplicationError;
    use crate::repository::{CompanyRepository, UserRepository};
    use crate::services::fixture::{now, Fixture};
    use crate::services::LATEST_NOTIFICATIONS;

    #[tokio::test]
    async fn test_new_resume_notifies_members_and_admins_once() {
        let fixture = Fixture::new().await;
        let company = fixture.company("Acme", None).await;
        let recruiter = fixture.recruiter("HR", "hr@example.com", company.id).await;
        let admin = fixture.user("Admin", "admin@example.com", ROLE_ADMIN).await;
        // 既是管理员又是公司成员，只收到一条
        let mut member_admin = fixture.user("Boss", "boss@example.com", ROLE_ADMIN).await;
        member_admin.assign_company(Some(company.id), now());
        UserRepository::update(fixture.db.as_ref(), member_admin.clone())
            .await
            .unwrap();
        let applicant = fixture.user("Applicant", "app@example.com", ROLE_USER).await;
        let job = fixture.job("Backend", Some(company.id), vec![]).await;
        let resume = Resume::submit(ResumeId::generate(), applicant.email.clone(), applicant.id, job.id, now());

        let service = fixture.notifications();
        let sent = service
            .notify_new_resume(&resume, &job, &applicant)
            .await
            .unwrap();
        assert_eq!(sent, 3);

        for user_id in [recruiter.id, admin.id, member_admin.id] {
            let list = service.latest(user_id).await.unwrap();
            assert_eq!(list.len(), 1);
            let notification = &list[0];
            assert_eq!(notification.title, "📄 CV mới: Backend");
            assert_eq!(
                notification.message,
                "Applicant vừa nộp CV ứng tuyển vị trí Backend"
            );
            assert_eq!(notification.kind, NotificationType::NewResume);
            assert_eq!(notification.action_url.as_deref(), Some("/admin/resume"));
            assert_eq!(notification.reference_id, Some(resume.id.0));
            assert_eq!(notification.sender.as_ref().unwrap().id, applicant.id);
        }
        assert!(service.latest(applicant.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_update_message_and_sender_logo() {
        let fixture = Fixture::new().await;
        let mut company = fixture.company("Acme", None).await;
        company.set_logo("memory://company-logos/acme.png", now());
        let company: Company = CompanyRepository::update(fixture.db.as_ref(), company)
            .await
            .unwrap();
        let recruiter = fixture.recruiter("HR", "hr@example.com", company.id).await;
        let applicant = fixture.user("Applicant", "app@example.com", ROLE_USER).await;
        let job = fixture.job("Backend", Some(company.id), vec![]).await;
        let mut resume = Resume::submit(ResumeId::generate(), applicant.email.clone(), applicant.id, job.id, now());
        resume.set_status(ResumeStatus::Approved, now());

        let dto = fixture
            .notifications()
            .notify_resume_status_updated(&resume, &job, Some(&company), Some(recruiter.id))
            .await
            .unwrap();

        assert_eq!(dto.title, "📋 Cập nhật trạng thái CV");
        assert_eq!(
            dto.message,
            "CV ứng tuyển vị trí Backend tại Acme đã được cập nhật: Đã được duyệt"
        );
        assert_eq!(dto.action_url.as_deref(), Some("/user/resumes"));
        let sender = dto.sender.unwrap();
        assert_eq!(sender.name, "HR");
        assert_eq!(
            sender.logo_url.as_deref(),
            Some("memory://company-logos/acme.png")
        );
    }

    #[tokio::test]
    async fn test_status_update_without_company() {
        let fixture = Fixture::new().await;
        let applicant = fixture.user("Applicant", "app@example.com", ROLE_USER).await;
        let job = fixture.job("Backend", None, vec![]).await;
        let resume = Resume::submit(ResumeId::generate(), applicant.email.clone(), applicant.id, job.id, now());

        let dto = fixture
            .notifications()
            .notify_resume_status_updated(&resume, &job, None, None)
            .await
            .unwrap();
        assert_eq!(
            dto.message,
            "CV ứng tuyển vị trí Backend đã được cập nhật: Đang chờ xử lý"
        );
        assert!(dto.sender.is_none());
    }

    #[tokio::test]
    async fn test_read_state_is_per_recipient() {
        let fixture = Fixture::new().await;
        let applicant = fixture.user("Applicant", "app@example.com", ROLE_USER).await;
        let stranger = fixture.user("Stranger", "x@example.com", ROLE_USER).await;
        let job = fixture.job("Backend", None, vec![]).await;
        let resume = Resume::submit(ResumeId::generate(), applicant.email.clone(), applicant.id, job.id, now());
        let service = fixture.notifications();
        let first = service
            .notify_resume_status_updated(&resume, &job, None, None)
            .await
            .unwrap();
        service
            .notify_resume_status_updated(&resume, &job, None, None)
            .await
            .unwrap();
        assert_eq!(service.unread_count(applicant.id).await.unwrap(), 2);

        let err = service.mark_as_read(stranger.id, first.id).await.unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::AccessDenied { .. })
        ));

        service.mark_as_read(applicant.id, first.id).await.unwrap();
        assert_eq!(service.unread_count(applicant.id).await.unwrap(), 1);
        assert_eq!(service.mark_all_as_read(applicant.id).await.unwrap(), 1);
        assert_eq!(service.unread_count(applicant.id).await.unwrap(), 0);

        let err = service
            .mark_as_read(applicant.id, NotificationId::generate())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::EntityNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_latest_is_capped() {
        let fixture = Fixture::new().await;
        let applicant = fixture.user("Applicant", "app@example.com", ROLE_USER).await;
        let job = fixture.job("Backend", None, vec![]).await;
        let resume = Resume::submit(ResumeId::generate(), applicant.email.clone(), applicant.id, job.id, now());
        let service = fixture.notifications();
        for _ in 0..12 {
            service
                .notify_resume_status_updated(&resume, &job, None, None)
                .await
                .unwrap();
        }

        assert_eq!(
            service.latest(applicant.id).await.unwrap().len(),
            LATEST_NOTIFICATIONS as usize
        );
        let page = service
            .list(applicant.id, PageRequest::new(2, 10))
            .await
            .unwrap();
        assert_eq!(page.total_elements, 12);
        assert_eq!(page.content.len(), 2);
    }
}
