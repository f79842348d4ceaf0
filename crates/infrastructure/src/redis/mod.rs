//! Redis 适配器
//!
//! 刷新令牌会话、OTP 验证码与发送计数、AI 对话历史缓存都存放在 Redis 中，
//! 三者共用一个 [`ConnectionManager`]，断线后自动重连。

pub mod chat_cache;
pub mod error;
pub mod otp;
pub mod session_store;

use redis::aio::ConnectionManager;

pub use chat_cache::RedisChatHistoryCache;
pub use error::*;
pub use otp::RedisOtpStore;
pub use session_store::RedisRefreshTokenStore;

/// 打开 Redis 连接管理器
pub async fn connect(url: &str) -> RedisResult<ConnectionManager> {
    let client = redis::Client::open(url)?;
    Ok(client.get_connection_manager().await?)
}
