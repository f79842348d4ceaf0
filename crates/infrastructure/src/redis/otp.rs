use std::time::Duration;

use application::{ApplicationError, OtpStore};
use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::RedisError;

fn otp_key(email: &str) -> String {
    format!("otp:{}", email.to_lowercase())
}

fn rate_limit_key(email: &str) -> String {
    format!("otp_rate_limit:{}", email.to_lowercase())
}

/// OTP 验证码与发送计数
#[derive(Clone)]
pub struct RedisOtpStore {
    conn: ConnectionManager,
}

impl RedisOtpStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    async fn del(&self, key: String) -> Result<(), ApplicationError> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<()>(&mut conn)
            .await
            .map_err(RedisError::from)?;
        Ok(())
    }
}

#[async_trait]
impl OtpStore for RedisOtpStore {
    async fn save_otp(
        &self,
        email: &str,
        otp: &str,
        ttl: Duration,
    ) -> Result<(), ApplicationError> {
        let mut conn = self.conn.clone();
        redis::cmd("SETEX")
            .arg(otp_key(email))
            .arg(ttl.as_secs().max(1))
            .arg(otp)
            .query_async::<()>(&mut conn)
            .await
            .map_err(RedisError::from)?;
        Ok(())
    }

    async fn get_otp(&self, email: &str) -> Result<Option<String>, ApplicationError> {
        let mut conn = self.conn.clone();
        let otp: Option<String> = redis::cmd("GET")
            .arg(otp_key(email))
            .query_async(&mut conn)
            .await
            .map_err(RedisError::from)?;
        Ok(otp)
    }

    async fn delete_otp(&self, email: &str) -> Result<(), ApplicationError> {
        self.del(otp_key(email)).await
    }

    async fn send_attempts(&self, email: &str) -> Result<u32, ApplicationError> {
        let mut conn = self.conn.clone();
        let count: Option<u32> = redis::cmd("GET")
            .arg(rate_limit_key(email))
            .query_async(&mut conn)
            .await
            .map_err(RedisError::from)?;
        Ok(count.unwrap_or(0))
    }

    async fn increment_attempts(
        &self,
        email: &str,
        window: Duration,
    ) -> Result<u32, ApplicationError> {
        let key = rate_limit_key(email);
        let mut conn = self.conn.clone();
        let count: u32 = redis::cmd("INCR")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .map_err(RedisError::from)?;
        // 窗口从第一次发送开始计时
        if count == 1 {
            redis::cmd("EXPIRE")
                .arg(&key)
                .arg(window.as_secs().max(1))
                .query_async::<()>(&mut conn)
                .await
                .map_err(RedisError::from)?;
        }
        Ok(count)
    }

    async fn reset_attempts(&self, email: &str) -> Result<(), ApplicationError> {
        self.del(rate_limit_key(email)).await
    }
}
