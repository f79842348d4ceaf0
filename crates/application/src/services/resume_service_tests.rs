//! 投递服务单元测试
//!
//! 覆盖投递校验、文件版本替换、状态流转时的通知与邮件、以及统计。

#[cfg(test)]
mod resume_service_tests {
    use std::sync::Arc;

    use chrono::Duration;
    use domain::{
        resume::file_key_for, DomainError, JobStatus, PageRequest, RepositoryError, ResumeStatus,
        ROLE_ADMIN, ROLE_USER,
    };

    use crate::error::ApplicationError;
    use crate::mailer::MockMailer;
    use crate::memory::SentMail;
    use crate::repository::{MockNotificationRepository, ResumeRepository};
    use crate::storage::MockFileStorage;
    use crate::services::fixture::{job_details, now, Fixture};
    use crate::services::{ApplyRequest, Scope};

    const PDF: &[u8] = b"%PDF-1.7 fake body";

    fn apply(email: &str, job_id: domain::JobId) -> ApplyRequest {
        ApplyRequest {
            email: email.to_string(),
            job_id,
            pdf: PDF.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_apply_stores_pdf_and_notifies_company() {
        let fixture = Fixture::new().await;
        let company = fixture.company("Acme", None).await;
        let recruiter = fixture.recruiter("HR", "hr@example.com", company.id).await;
        let applicant = fixture.user("Applicant", "app@example.com", ROLE_USER).await;
        let job = fixture.job("Backend", Some(company.id), vec![]).await;

        let resume = fixture
            .resumes()
            .apply(applicant.id, apply("APP@example.com", job.id))
            .await
            .unwrap();

        assert_eq!(resume.status, ResumeStatus::Pending);
        assert_eq!(resume.version, 1);
        assert_eq!(resume.company.unwrap().name, "Acme");
        let key = file_key_for(&applicant.email, resume.id, 1);
        assert_eq!(fixture.files.get(&key).await.as_deref(), Some(PDF));
        assert_eq!(resume.pdf_url, format!("memory://{key}"));

        let inbox = fixture.notifications().latest(recruiter.id).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(fixture.resumes().has_applied(applicant.id, job.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_apply_with_foreign_email_is_denied() {
        let fixture = Fixture::new().await;
        let applicant = fixture.user("Applicant", "app@example.com", ROLE_USER).await;
        let job = fixture.job("Backend", None, vec![]).await;

        let err = fixture
            .resumes()
            .apply(applicant.id, apply("someone@example.com", job.id))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::AccessDenied { .. })
        ));
    }

    #[tokio::test]
    async fn test_apply_to_closed_jobs_is_rejected() {
        let fixture = Fixture::new().await;
        let applicant = fixture.user("Applicant", "app@example.com", ROLE_USER).await;
        let mut overdue = job_details("Overdue");
        overdue.start_date = now() - Duration::days(30);
        overdue.end_date = now() - Duration::days(1);
        let overdue = fixture.job_with(overdue, None, vec![]).await;
        let mut paused = job_details("Paused");
        paused.status = JobStatus::Paused;
        let paused = fixture.job_with(paused, None, vec![]).await;
        let service = fixture.resumes();

        for job_id in [overdue.id, paused.id] {
            let err = service
                .apply(applicant.id, apply("app@example.com", job_id))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                ApplicationError::Domain(DomainError::BusinessRule { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_apply_twice_or_with_non_pdf_fails() {
        let fixture = Fixture::new().await;
        let applicant = fixture.user("Applicant", "app@example.com", ROLE_USER).await;
        let job = fixture.job("Backend", None, vec![]).await;
        let other = fixture.job("Frontend", None, vec![]).await;
        let service = fixture.resumes();

        let err = service
            .apply(
                applicant.id,
                ApplyRequest {
                    email: "app@example.com".into(),
                    job_id: other.id,
                    pdf: b"PK\x03\x04 not a pdf".to_vec(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::InvalidArgument { .. })
        ));

        service
            .apply(applicant.id, apply("app@example.com", job.id))
            .await
            .unwrap();
        let err = service
            .apply(applicant.id, apply("app@example.com", job.id))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::EntityAlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_apply_rolls_back_record_when_upload_fails() {
        let fixture = Fixture::new().await;
        let applicant = fixture.user("Applicant", "app@example.com", ROLE_USER).await;
        let job = fixture.job("Backend", None, vec![]).await;

        let mut storage = MockFileStorage::new();
        storage
            .expect_put()
            .times(1)
            .returning(|_, _| Err(ApplicationError::infrastructure("disk full")));
        let broken = fixture.resumes_with(
            Arc::new(storage),
            fixture.db.clone(),
            fixture.mailer.clone(),
        );

        let err = broken
            .apply(applicant.id, apply("app@example.com", job.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Infrastructure(_)));

        let service = fixture.resumes();
        assert!(!service.has_applied(applicant.id, job.id).await.unwrap());
        service
            .apply(applicant.id, apply("app@example.com", job.id))
            .await
            .unwrap();
        assert!(service.has_applied(applicant.id, job.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_file_bumps_version_and_drops_old_file() {
        let fixture = Fixture::new().await;
        let applicant = fixture.user("Applicant", "app@example.com", ROLE_USER).await;
        let stranger = fixture.user("Stranger", "x@example.com", ROLE_USER).await;
        let job = fixture.job("Backend", None, vec![]).await;
        let service = fixture.resumes();
        let resume = service
            .apply(applicant.id, apply("app@example.com", job.id))
            .await
            .unwrap();

        let err = service
            .replace_self_file(stranger.id, resume.id, PDF.to_vec())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::AccessDenied { .. })
        ));

        let replaced = service
            .replace_self_file(applicant.id, resume.id, b"%PDF-2.0".to_vec())
            .await
            .unwrap();
        assert_eq!(replaced.version, 2);
        assert_eq!(
            fixture.files.keys().await,
            vec![file_key_for(&applicant.email, resume.id, 2)]
        );
    }

    #[tokio::test]
    async fn test_withdraw_removes_resume_and_file() {
        let fixture = Fixture::new().await;
        let applicant = fixture.user("Applicant", "app@example.com", ROLE_USER).await;
        let job = fixture.job("Backend", None, vec![]).await;
        let service = fixture.resumes();
        service
            .apply(applicant.id, apply("app@example.com", job.id))
            .await
            .unwrap();

        service.remove_self_by_job(applicant.id, job.id).await.unwrap();
        assert!(!service.has_applied(applicant.id, job.id).await.unwrap());
        assert!(fixture.files.keys().await.is_empty());

        let err = service
            .remove_self_by_job(applicant.id, job.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::EntityNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_file_url_visibility() {
        let fixture = Fixture::new().await;
        let company = fixture.company("Acme", None).await;
        let other = fixture.company("Other", None).await;
        let recruiter = fixture.recruiter("HR", "hr@example.com", company.id).await;
        let outsider = fixture.recruiter("HR2", "hr2@example.com", other.id).await;
        let admin = fixture.user("Admin", "admin@example.com", ROLE_ADMIN).await;
        let applicant = fixture.user("Applicant", "app@example.com", ROLE_USER).await;
        let job = fixture.job("Backend", Some(company.id), vec![]).await;
        let service = fixture.resumes();
        let resume = service
            .apply(applicant.id, apply("app@example.com", job.id))
            .await
            .unwrap();

        assert!(service.file_url(applicant.id, false, resume.id).await.is_ok());
        assert!(service.file_url(recruiter.id, false, resume.id).await.is_ok());
        assert!(service.file_url(admin.id, true, resume.id).await.is_ok());
        let err = service
            .file_url(outsider.id, false, resume.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::AccessDenied { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_status_notifies_and_mails_applicant() {
        let fixture = Fixture::new().await;
        let company = fixture.company("Acme", None).await;
        let recruiter = fixture.recruiter("HR", "hr@example.com", company.id).await;
        let applicant = fixture.user("Applicant", "app@example.com", ROLE_USER).await;
        let job = fixture.job("Backend", Some(company.id), vec![]).await;
        let service = fixture.resumes();
        let resume = service
            .apply(applicant.id, apply("app@example.com", job.id))
            .await
            .unwrap();

        let updated = service
            .update_status(
                recruiter.id,
                resume.id,
                ResumeStatus::Approved,
                Scope::Recruiter(recruiter.id),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, ResumeStatus::Approved);

        let inbox = fixture.notifications().latest(applicant.id).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].sender.as_ref().unwrap().id, recruiter.id);

        let sent = fixture.mailer.sent().await;
        let Some(SentMail::ResumeStatus(mail)) = sent.last() else {
            panic!("status mail was not sent: {sent:?}");
        };
        assert_eq!(mail.to, applicant.email);
        assert_eq!(mail.applicant_name, "Applicant");
        assert_eq!(mail.company_name.as_deref(), Some("Acme"));
        assert_eq!(mail.status, ResumeStatus::Approved);
    }

    #[tokio::test]
    async fn test_update_status_survives_mail_failure() {
        let fixture = Fixture::new().await;
        let applicant = fixture.user("Applicant", "app@example.com", ROLE_USER).await;
        let admin = fixture.user("Admin", "admin@example.com", ROLE_ADMIN).await;
        let job = fixture.job("Backend", None, vec![]).await;
        let resume = fixture
            .resumes()
            .apply(applicant.id, apply("app@example.com", job.id))
            .await
            .unwrap();

        let mut mailer = MockMailer::new();
        mailer
            .expect_send_resume_status()
            .times(1)
            .returning(|_| Err(ApplicationError::infrastructure("smtp down")));
        let service = fixture.resumes_with_mailer(Arc::new(mailer));

        let updated = service
            .update_status(admin.id, resume.id, ResumeStatus::Rejected, Scope::Admin)
            .await
            .unwrap();
        assert_eq!(updated.status, ResumeStatus::Rejected);
    }

    #[tokio::test]
    async fn test_update_status_survives_notification_failure() {
        let fixture = Fixture::new().await;
        let applicant = fixture.user("Applicant", "app@example.com", ROLE_USER).await;
        let admin = fixture.user("Admin", "admin@example.com", ROLE_ADMIN).await;
        let job = fixture.job("Backend", None, vec![]).await;
        let resume = fixture
            .resumes()
            .apply(applicant.id, apply("app@example.com", job.id))
            .await
            .unwrap();

        let mut notifications = MockNotificationRepository::new();
        notifications
            .expect_create()
            .times(1)
            .returning(|_| Err(RepositoryError::storage("connection reset")));
        let service = fixture.resumes_with(
            fixture.files.clone(),
            Arc::new(notifications),
            fixture.mailer.clone(),
        );

        let updated = service
            .update_status(admin.id, resume.id, ResumeStatus::Approved, Scope::Admin)
            .await
            .unwrap();
        assert_eq!(updated.status, ResumeStatus::Approved);

        let stored = ResumeRepository::find_by_id(fixture.db.as_ref(), resume.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ResumeStatus::Approved);
        let sent = fixture.mailer.sent().await;
        assert!(matches!(sent.last(), Some(SentMail::ResumeStatus(_))));
    }

    #[tokio::test]
    async fn test_recruiter_cannot_update_foreign_resume() {
        let fixture = Fixture::new().await;
        let company = fixture.company("Acme", None).await;
        let other = fixture.company("Other", None).await;
        let outsider = fixture.recruiter("HR2", "hr2@example.com", other.id).await;
        let applicant = fixture.user("Applicant", "app@example.com", ROLE_USER).await;
        let job = fixture.job("Backend", Some(company.id), vec![]).await;
        let service = fixture.resumes();
        let resume = service
            .apply(applicant.id, apply("app@example.com", job.id))
            .await
            .unwrap();

        let err = service
            .update_status(
                outsider.id,
                resume.id,
                ResumeStatus::Approved,
                Scope::Recruiter(outsider.id),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::AccessDenied { .. })
        ));
    }

    #[tokio::test]
    async fn test_listing_and_status_counts_by_scope() {
        let fixture = Fixture::new().await;
        let company = fixture.company("Acme", None).await;
        let recruiter = fixture.recruiter("HR", "hr@example.com", company.id).await;
        let first = fixture.user("First", "first@example.com", ROLE_USER).await;
        let second = fixture.user("Second", "second@example.com", ROLE_USER).await;
        let own_job = fixture.job("Backend", Some(company.id), vec![]).await;
        let open_job = fixture.job("Freelance", None, vec![]).await;
        let service = fixture.resumes();
        service
            .apply(first.id, apply("first@example.com", own_job.id))
            .await
            .unwrap();
        service
            .apply(second.id, apply("second@example.com", own_job.id))
            .await
            .unwrap();
        service
            .apply(first.id, apply("first@example.com", open_job.id))
            .await
            .unwrap();

        let page = PageRequest::new(1, 10);
        assert_eq!(service.list_all(page).await.unwrap().total_elements, 3);
        assert_eq!(
            service
                .list_for_company(recruiter.id, page)
                .await
                .unwrap()
                .total_elements,
            2
        );
        assert_eq!(service.list_self(first.id, page).await.unwrap().total_elements, 2);

        let all = service.count_by_status(Scope::Admin).await.unwrap();
        assert_eq!(all.len(), ResumeStatus::ALL.len());
        assert_eq!(all[0].status, ResumeStatus::Pending);
        assert_eq!(all[0].count, 3);
        assert_eq!(all[2].count, 0);

        let own = service
            .count_by_status(Scope::Recruiter(recruiter.id))
            .await
            .unwrap();
        assert_eq!(own[0].count, 2);
    }
}
