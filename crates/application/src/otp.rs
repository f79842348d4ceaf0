use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::error::ApplicationError;

pub const OTP_TTL: Duration = Duration::from_secs(5 * 60);
pub const OTP_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(15 * 60);
/// 一个限流窗口内最多发送次数
pub const OTP_MAX_SENDS: u32 = 3;

/// 6 位数字验证码，范围 100000..=999999。
pub fn generate_otp() -> String {
    rand::rng().random_range(100_000..=999_999).to_string()
}

/// 一次性密码与发送计数存储。
///
/// Redis 实现使用 `otp:{email}` 与 `otp_rate_limit:{email}` 两个键。
#[async_trait]
pub trait OtpStore: Send + Sync {
    async fn save_otp(&self, email: &str, otp: &str, ttl: Duration)
        -> Result<(), ApplicationError>;
    async fn get_otp(&self, email: &str) -> Result<Option<String>, ApplicationError>;
    async fn delete_otp(&self, email: &str) -> Result<(), ApplicationError>;
    async fn send_attempts(&self, email: &str) -> Result<u32, ApplicationError>;
    /// 首次发送时以 `window` 为有效期写入 1，之后递增，返回递增后的次数
    async fn increment_attempts(
        &self,
        email: &str,
        window: Duration,
    ) -> Result<u32, ApplicationError>;
    async fn reset_attempts(&self, email: &str) -> Result<(), ApplicationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..200 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            let value: u32 = otp.parse().unwrap();
            assert!((100_000..=999_999).contains(&value));
        }
    }
}
