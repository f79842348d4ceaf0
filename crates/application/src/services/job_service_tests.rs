//! 职位服务单元测试
//!
//! 覆盖管理员与招聘者两种身份下的增删改、统计以及过期任务。

#[cfg(test)]
mod job_service_tests {
    use chrono::Duration;
    use domain::{
        CompanyId, DomainError, JobLevel, JobStatus, PageRequest, ResumeId, Resume, SkillId,
        ROLE_RECRUITER, ROLE_USER,
    };

    use crate::error::ApplicationError;
    use crate::repository::{JobFilter, ResumeRepository};
    use crate::services::fixture::{job_details, now, Fixture};
    use crate::services::{JobRequest, Scope};
    use crate::storage::FileStorage;

    fn request(name: &str, company_id: Option<CompanyId>, skill_ids: Vec<SkillId>) -> JobRequest {
        JobRequest {
            details: job_details(name),
            company_id,
            skill_ids,
        }
    }

    #[tokio::test]
    async fn test_admin_creates_job_for_any_company() {
        let fixture = Fixture::new().await;
        let company = fixture.company("Acme", None).await;
        let rust = fixture.skill("Rust").await;

        let job = fixture
            .jobs()
            .create(request("Backend", Some(company.id), vec![rust.id]), Scope::Admin)
            .await
            .unwrap();

        assert_eq!(job.company.unwrap().name, "Acme");
        assert_eq!(job.skills.len(), 1);
        assert_eq!(job.status, JobStatus::Active);
    }

    #[tokio::test]
    async fn test_create_with_unknown_skill_fails() {
        let fixture = Fixture::new().await;
        let err = fixture
            .jobs()
            .create(request("Backend", None, vec![SkillId::generate()]), Scope::Admin)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::BusinessRule { .. })
        ));
    }

    #[tokio::test]
    async fn test_recruiter_job_is_bound_to_own_company() {
        let fixture = Fixture::new().await;
        let mine = fixture.company("Mine", None).await;
        let other = fixture.company("Other", None).await;
        let recruiter = fixture.recruiter("R", "r@example.com", mine.id).await;

        let job = fixture
            .jobs()
            .create(
                request("Backend", Some(other.id), vec![]),
                Scope::Recruiter(recruiter.id),
            )
            .await
            .unwrap();
        assert_eq!(job.company.unwrap().id, mine.id);
    }

    #[tokio::test]
    async fn test_recruiter_without_company_cannot_create() {
        let fixture = Fixture::new().await;
        let recruiter = fixture.user("R", "r@example.com", ROLE_RECRUITER).await;

        let err = fixture
            .jobs()
            .create(request("Backend", None, vec![]), Scope::Recruiter(recruiter.id))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::AccessDenied { .. })
        ));
    }

    #[tokio::test]
    async fn test_recruiter_cannot_touch_other_company_jobs() {
        let fixture = Fixture::new().await;
        let mine = fixture.company("Mine", None).await;
        let other = fixture.company("Other", None).await;
        let recruiter = fixture.recruiter("R", "r@example.com", mine.id).await;
        let foreign = fixture.job("Foreign", Some(other.id), vec![]).await;
        let service = fixture.jobs();

        let err = service
            .update(
                foreign.id,
                request("Hijack", None, vec![]),
                Scope::Recruiter(recruiter.id),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::AccessDenied { .. })
        ));

        let err = service
            .delete(foreign.id, Scope::Recruiter(recruiter.id))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::AccessDenied { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_replaces_details_and_skills() {
        let fixture = Fixture::new().await;
        let go = fixture.skill("Go").await;
        let job = fixture.job("Backend", None, vec![]).await;

        let mut update = request("Backend Senior", None, vec![go.id]);
        update.details.level = JobLevel::Senior;
        let updated = fixture
            .jobs()
            .update(job.id, update, Scope::Admin)
            .await
            .unwrap();

        assert_eq!(updated.name, "Backend Senior");
        assert_eq!(updated.level, JobLevel::Senior);
        assert_eq!(updated.skills[0].name, "Go");
    }

    #[tokio::test]
    async fn test_delete_cleans_resume_files() {
        let fixture = Fixture::new().await;
        let user = fixture.user("A", "a@example.com", ROLE_USER).await;
        let job = fixture.job("Backend", None, vec![]).await;
        let resume = Resume::submit(ResumeId::generate(), user.email.clone(), user.id, job.id, now());
        fixture
            .files
            .put(&resume.file_key, b"%PDF".to_vec())
            .await
            .unwrap();
        ResumeRepository::create(fixture.db.as_ref(), resume.clone())
            .await
            .unwrap();

        fixture.jobs().delete(job.id, Scope::Admin).await.unwrap();

        assert!(fixture.files.keys().await.is_empty());
        assert!(ResumeRepository::find_by_id(fixture.db.as_ref(), resume.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_list_filters_and_shows_display_status() {
        let fixture = Fixture::new().await;
        let mut overdue = job_details("Old backend");
        overdue.start_date = now() - Duration::days(60);
        overdue.end_date = now() - Duration::days(1);
        fixture.job_with(overdue, None, vec![]).await;
        fixture.job("Frontend", None, vec![]).await;

        let page = fixture
            .jobs()
            .list(
                JobFilter {
                    name: Some("backend".to_string()),
                    ..Default::default()
                },
                PageRequest::new(1, 10),
            )
            .await
            .unwrap();
        assert_eq!(page.total_elements, 1);
        // 存储状态仍为 ACTIVE，展示时按截止日期判定
        assert_eq!(page.content[0].status, JobStatus::Expired);
    }

    #[tokio::test]
    async fn test_count_by_level_fills_missing_levels() {
        let fixture = Fixture::new().await;
        let mine = fixture.company("Mine", None).await;
        let recruiter = fixture.recruiter("R", "r@example.com", mine.id).await;
        fixture.job("A", Some(mine.id), vec![]).await;
        fixture.job("B", None, vec![]).await;
        let mut senior = job_details("C");
        senior.level = JobLevel::Senior;
        fixture.job_with(senior, Some(mine.id), vec![]).await;

        let all = fixture.jobs().count_by_level(Scope::Admin).await.unwrap();
        assert_eq!(all.len(), JobLevel::ALL.len());
        let middle = all.iter().find(|c| c.level == JobLevel::Middle).unwrap();
        assert_eq!(middle.count, 2);
        let intern = all.iter().find(|c| c.level == JobLevel::Intern).unwrap();
        assert_eq!(intern.count, 0);

        let own = fixture
            .jobs()
            .count_by_level(Scope::Recruiter(recruiter.id))
            .await
            .unwrap();
        let total: u64 = own.iter().map(|c| c.count).sum();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_expire_overdue_only_touches_active_jobs() {
        let fixture = Fixture::new().await;
        let mut overdue = job_details("Overdue");
        overdue.start_date = now() - Duration::days(60);
        overdue.end_date = now() - Duration::days(1);
        let expired = fixture.job_with(overdue.clone(), None, vec![]).await;
        let mut paused = overdue;
        paused.name = "Paused".to_string();
        paused.status = JobStatus::Paused;
        fixture.job_with(paused, None, vec![]).await;
        fixture.job("Open", None, vec![]).await;

        let service = fixture.jobs();
        assert_eq!(service.expire_overdue().await.unwrap(), 1);
        assert_eq!(service.expire_overdue().await.unwrap(), 0);
        assert_eq!(
            service.get(expired.id).await.unwrap().status,
            JobStatus::Expired
        );
    }

    #[tokio::test]
    async fn test_list_for_recruiter() {
        let fixture = Fixture::new().await;
        let mine = fixture.company("Mine", None).await;
        let recruiter = fixture.recruiter("R", "r@example.com", mine.id).await;
        fixture.job("Mine 1", Some(mine.id), vec![]).await;
        fixture.job("Elsewhere", None, vec![]).await;

        let page = fixture
            .jobs()
            .list_for_recruiter(recruiter.id, PageRequest::new(1, 10))
            .await
            .unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].name, "Mine 1");
    }
}
