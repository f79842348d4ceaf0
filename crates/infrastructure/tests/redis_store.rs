use std::time::Duration;

use application::{ChatHistoryCache, OtpStore, RefreshTokenStore};
use chrono::{SubsecRound, Utc};
use domain::{ChatMessage, MessageRole, SessionKey, SessionMeta, UserId};
use infrastructure::redis::{
    connect, RedisChatHistoryCache, RedisOtpStore, RedisRefreshTokenStore,
};
use redis::aio::ConnectionManager;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::redis::Redis;

async fn start() -> (ContainerAsync<Redis>, ConnectionManager) {
    let node = Redis::default().start().await.expect("start redis");
    let port = node.get_host_port_ipv4(6379u16).await.expect("port");
    let conn = connect(&format!("redis://127.0.0.1:{port}"))
        .await
        .expect("connect");
    (node, conn)
}

fn meta(device: &str) -> SessionMeta {
    SessionMeta {
        device_name: device.to_string(),
        device_type: "desktop".to_string(),
        user_agent: "Mozilla/5.0".to_string(),
        login_at: Utc::now().trunc_subsecs(0),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires local docker daemon"]
async fn refresh_sessions_are_listed_per_user() {
    let (_node, conn) = start().await;
    let store = RedisRefreshTokenStore::new(conn);
    let alice = UserId::generate();
    let bob = UserId::generate();

    let laptop = SessionKey::new("token-a", alice);
    let phone = SessionKey::new("token-b", alice);
    store.save(&laptop, &meta("laptop"), 60).await.unwrap();
    store.save(&phone, &meta("phone"), 60).await.unwrap();
    store
        .save(&SessionKey::new("token-c", bob), &meta("tablet"), 60)
        .await
        .unwrap();

    let mut sessions = store.list_for_user(alice).await.unwrap();
    sessions.sort_by(|a, b| a.1.device_name.cmp(&b.1.device_name));
    let devices: Vec<&str> = sessions.iter().map(|(_, m)| m.device_name.as_str()).collect();
    assert_eq!(devices, vec!["laptop", "phone"]);

    assert!(store.exists(&laptop).await.unwrap());
    store.delete(&laptop).await.unwrap();
    assert!(!store.exists(&laptop).await.unwrap());
    assert_eq!(store.list_for_user(alice).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires local docker daemon"]
async fn otp_and_send_counter() {
    let (_node, conn) = start().await;
    let store = RedisOtpStore::new(conn);
    let email = "an@example.com";

    store
        .save_otp(email, "123456", Duration::from_secs(300))
        .await
        .unwrap();
    assert_eq!(store.get_otp("AN@example.com").await.unwrap().as_deref(), Some("123456"));
    store.delete_otp(email).await.unwrap();
    assert_eq!(store.get_otp(email).await.unwrap(), None);

    assert_eq!(store.send_attempts(email).await.unwrap(), 0);
    let window = Duration::from_secs(900);
    assert_eq!(store.increment_attempts(email, window).await.unwrap(), 1);
    assert_eq!(store.increment_attempts(email, window).await.unwrap(), 2);
    assert_eq!(store.send_attempts(email).await.unwrap(), 2);
    store.reset_attempts(email).await.unwrap();
    assert_eq!(store.send_attempts(email).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires local docker daemon"]
async fn chat_history_append_and_clear() {
    let (_node, conn) = start().await;
    let cache = RedisChatHistoryCache::new(conn);
    let user = UserId::generate();
    let now = Utc::now().trunc_subsecs(0);

    assert!(cache.load(user, "s1").await.unwrap().is_none());

    let question = ChatMessage::new(user, "s1", MessageRole::User, "Xin chào", now);
    let answer = ChatMessage::new(user, "s1", MessageRole::Assistant, "Chào bạn", now);
    cache.store(user, "s1", std::slice::from_ref(&question)).await.unwrap();
    cache.append(user, "s1", &answer).await.unwrap();

    let history = cache.load(user, "s1").await.unwrap().unwrap();
    assert_eq!(history, vec![question, answer]);

    cache.clear(user, "s1").await.unwrap();
    assert!(cache.load(user, "s1").await.unwrap().is_none());
}
