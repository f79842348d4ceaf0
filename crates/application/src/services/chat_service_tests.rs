//! AI 对话服务测试
//!
//! 数据库与缓存都用内存实现，大模型用固定回答或 mock。

#[cfg(test)]
mod chat_service_tests {
    use std::sync::Arc;

    use chrono::Duration;
    use domain::{ChatMessage, DomainError, MessageRole, UserId, ROLE_USER};

    use crate::chat_cache::ChatHistoryCache;
    use crate::error::ApplicationError;
    use crate::llm::MockLlmClient;
    use crate::repository::ChatMessageRepository;
    use crate::services::fixture::{now, Fixture};

    #[tokio::test]
    async fn test_send_records_both_turns() {
        let fixture = Fixture::new().await;
        let user = fixture.user("A", "a@example.com", ROLE_USER).await;
        let service = fixture.chat();

        let answer = service.send(user.id, "s1", "Tôi nên học gì?").await.unwrap();
        assert_eq!(answer.session_id, "s1");
        assert_eq!(answer.answer, "Bạn nên học Rust.");

        let stored = ChatMessageRepository::list_by_session(fixture.db.as_ref(), user.id, "s1", 10)
            .await
            .unwrap();
        let roles: Vec<MessageRole> = stored.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);

        let cached = fixture.chat_cache.load(user.id, "s1").await.unwrap().unwrap();
        assert_eq!(cached, stored);
    }

    #[tokio::test]
    async fn test_follow_up_prompt_contains_history() {
        let fixture = Fixture::new().await;
        let user = fixture.user("A", "a@example.com", ROLE_USER).await;
        let service = fixture.chat();

        service.send(user.id, "s1", "Xin chào").await.unwrap();
        service.send(user.id, "s1", "Tiếp theo?").await.unwrap();

        let prompts = fixture.llm.prompts().await;
        assert_eq!(prompts.len(), 2);
        assert!(!prompts[0].contains("=== Lịch sử"));
        assert!(prompts[1].contains("👤 Người dùng: Xin chào"));
        assert!(prompts[1].contains("🤖 Trợ lý: Bạn nên học Rust."));
        assert!(prompts[1].contains("(câu hỏi hiện tại): Tiếp theo?"));
    }

    #[tokio::test]
    async fn test_history_is_backfilled_from_database() {
        let fixture = Fixture::new().await;
        let user = fixture.user("A", "a@example.com", ROLE_USER).await;
        ChatMessageRepository::create(
            fixture.db.as_ref(),
            ChatMessage::new(user.id, "old", MessageRole::User, "câu hỏi cũ", now()),
        )
        .await
        .unwrap();
        assert!(fixture.chat_cache.load(user.id, "old").await.unwrap().is_none());

        let history = fixture.chat().history(user.id, "old").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].created_by, "a@example.com");
        assert_eq!(
            fixture.chat_cache.load(user.id, "old").await.unwrap().map(|m| m.len()),
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_llm_failure_keeps_question_only() {
        let fixture = Fixture::new().await;
        let user = fixture.user("A", "a@example.com", ROLE_USER).await;
        let mut llm = MockLlmClient::new();
        llm.expect_complete()
            .times(1)
            .returning(|_| Err(ApplicationError::infrastructure("timeout")));
        let service = fixture.chat_with_llm(Arc::new(llm));

        let err = service.send(user.id, "s1", "Xin chào").await.unwrap_err();
        assert!(matches!(err, ApplicationError::Infrastructure(ref msg) if msg.starts_with("Lỗi kết nối AI")));

        let count = ChatMessageRepository::count_by_session(fixture.db.as_ref(), user.id, "s1")
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_send_validates_input() {
        let fixture = Fixture::new().await;
        let user = fixture.user("A", "a@example.com", ROLE_USER).await;
        let service = fixture.chat();

        let too_long = "a".repeat(501);
        for (session, question) in [("s1", "   "), ("s1", too_long.as_str()), (" ", "hi")] {
            let err = service.send(user.id, session, question).await.unwrap_err();
            assert!(matches!(
                err,
                ApplicationError::Domain(DomainError::InvalidArgument { .. })
            ));
        }
        assert!(fixture.llm.prompts().await.is_empty());

        let err = service
            .send(UserId::generate(), "s1", "hi")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::EntityNotFound { entity: "user", .. })
        ));
    }

    #[tokio::test]
    async fn test_sessions_sorted_by_last_message() {
        let fixture = Fixture::new().await;
        let user = fixture.user("A", "a@example.com", ROLE_USER).await;
        let db = fixture.db.as_ref();
        let long_question = "ồ".repeat(60);
        for message in [
            ChatMessage::new(user.id, "early", MessageRole::User, long_question.as_str(), now() - Duration::hours(3)),
            ChatMessage::new(user.id, "early", MessageRole::Assistant, "ok", now() - Duration::hours(2)),
            ChatMessage::new(user.id, "late", MessageRole::Assistant, "chào", now() - Duration::hours(1)),
        ] {
            ChatMessageRepository::create(db, message).await.unwrap();
        }

        let sessions = fixture.chat().sessions(user.id).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session_id, "late");
        assert_eq!(sessions[0].first_message, "Chat session");
        assert_eq!(sessions[1].session_id, "early");
        assert_eq!(sessions[1].message_count, 2);
        assert!(sessions[1].first_message.ends_with("..."));
        assert_eq!(sessions[1].last_message, "ok");
    }

    #[tokio::test]
    async fn test_clear_and_session_info() {
        let fixture = Fixture::new().await;
        let user = fixture.user("A", "a@example.com", ROLE_USER).await;
        let service = fixture.chat();
        service.send(user.id, "s1", "Xin chào").await.unwrap();

        let info = service.session_info(user.id, "s1").await.unwrap();
        assert!(info.exists);
        assert_eq!(info.message_count, 2);

        assert_eq!(service.clear(user.id, "s1").await.unwrap(), 2);
        let info = service.session_info(user.id, "s1").await.unwrap();
        assert!(!info.exists);
        assert_eq!(info.message_count, 0);
        assert!(fixture.chat_cache.load(user.id, "s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_new_session_ids_are_unique() {
        let fixture = Fixture::new().await;
        let user = fixture.user("A", "a@example.com", ROLE_USER).await;
        let service = fixture.chat();

        let first = service.new_session(user.id).await.unwrap();
        let second = service.new_session(user.id).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(first.len(), 36);
    }
}
