//! 技能服务测试

#[cfg(test)]
mod skill_service_tests {
    use domain::{DomainError, PageRequest, SkillId};

    use crate::error::ApplicationError;
    use crate::services::fixture::Fixture;

    #[tokio::test]
    async fn test_create_trims_name_and_rejects_duplicates() {
        let fixture = Fixture::new().await;
        let service = fixture.skills();

        let rust = service.create("  Rust ").await.unwrap();
        assert_eq!(rust.name, "Rust");

        let err = service.create("rust").await.unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::EntityAlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_name() {
        let fixture = Fixture::new().await;
        let service = fixture.skills();
        service.create("Rust").await.unwrap();
        service.create("TypeScript").await.unwrap();
        service.create("JavaScript").await.unwrap();

        let page = service
            .list(Some("script"), PageRequest::new(1, 10))
            .await
            .unwrap();
        assert_eq!(page.total_elements, 2);
    }

    #[tokio::test]
    async fn test_update_renames_and_keeps_uniqueness() {
        let fixture = Fixture::new().await;
        let service = fixture.skills();
        let rust = service.create("Rust").await.unwrap();
        service.create("Go").await.unwrap();

        let renamed = service.update(rust.id, "Rust 2024").await.unwrap();
        assert_eq!(renamed.name, "Rust 2024");

        let err = service.update(rust.id, "go").await.unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::EntityAlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_detaches_skill_from_jobs() {
        let fixture = Fixture::new().await;
        let rust = fixture.skill("Rust").await;
        let sql = fixture.skill("SQL").await;
        let job = fixture.job("Backend", None, vec![rust.clone(), sql]).await;

        fixture.skills().delete(rust.id).await.unwrap();

        let job = fixture.jobs().get(job.id).await.unwrap();
        let names: Vec<String> = job.skills.into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["SQL".to_string()]);
    }

    #[tokio::test]
    async fn test_get_unknown_skill() {
        let fixture = Fixture::new().await;
        let err = fixture.skills().get(SkillId::generate()).await.unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::EntityNotFound { entity: "skill", .. })
        ));
    }
}
