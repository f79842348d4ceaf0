//! 忘记密码：邮件 OTP 校验与重置

use std::sync::Arc;

use domain::{Email, User};
use tracing::{info, warn};

use crate::{
    clock::Clock,
    dto::{OtpResponseDto, ResetPasswordResponseDto, VerifyOtpResponseDto},
    error::ApplicationError,
    mailer::Mailer,
    otp::{generate_otp, OtpStore, OTP_MAX_SENDS, OTP_RATE_LIMIT_WINDOW, OTP_TTL},
    password::PasswordHasher,
    repository::UserRepository,
};

pub struct PasswordResetServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub otp_store: Arc<dyn OtpStore>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub mailer: Arc<dyn Mailer>,
    pub clock: Arc<dyn Clock>,
}

pub struct PasswordResetService {
    deps: PasswordResetServiceDependencies,
}

#[derive(Debug, Clone)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

impl PasswordResetService {
    pub fn new(deps: PasswordResetServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn forgot(&self, email: &str) -> Result<OtpResponseDto, ApplicationError> {
        let user = self.find_user(email).await?;
        let key = otp_key(&user.email);

        if self.deps.otp_store.get_otp(&key).await?.is_some() {
            return Err(ApplicationError::business_rule(
                "Mã OTP trước đó vẫn còn hiệu lực. Vui lòng kiểm tra email hoặc đợi 5 phút để gửi lại.",
            ));
        }
        self.ensure_can_send(&key).await?;

        let remaining = self.send_new_otp(&user, &key).await?;
        Ok(OtpResponseDto {
            success: true,
            message: "Mã OTP đã được gửi đến email của bạn. Vui lòng kiểm tra hộp thư.".to_string(),
            expires_in: OTP_TTL.as_secs(),
            remaining_attempts: remaining,
        })
    }

    pub async fn resend(&self, email: &str) -> Result<OtpResponseDto, ApplicationError> {
        let user = self.find_user(email).await?;
        let key = otp_key(&user.email);

        self.ensure_can_send(&key).await?;
        self.deps.otp_store.delete_otp(&key).await?;

        let remaining = self.send_new_otp(&user, &key).await?;
        Ok(OtpResponseDto {
            success: true,
            message: "Mã OTP mới đã được gửi đến email của bạn.".to_string(),
            expires_in: OTP_TTL.as_secs(),
            remaining_attempts: remaining,
        })
    }

    pub async fn verify(
        &self,
        email: &str,
        otp: &str,
    ) -> Result<VerifyOtpResponseDto, ApplicationError> {
        let user = self.find_user(email).await?;
        let is_valid = self.otp_matches(&otp_key(&user.email), otp).await?;
        let message = if is_valid {
            "Mã OTP hợp lệ. Bạn có thể tiến hành đặt lại mật khẩu."
        } else {
            "Mã OTP không hợp lệ hoặc đã hết hạn."
        };
        Ok(VerifyOtpResponseDto {
            success: true,
            message: message.to_string(),
            is_valid,
        })
    }

    pub async fn reset(
        &self,
        request: ResetPasswordRequest,
    ) -> Result<ResetPasswordResponseDto, ApplicationError> {
        let mut user = self.find_user(&request.email).await?;
        let key = otp_key(&user.email);

        if !self.otp_matches(&key, &request.otp).await? {
            return Err(ApplicationError::business_rule(
                "Mã OTP không hợp lệ hoặc đã hết hạn",
            ));
        }

        let password = self
            .deps
            .password_hasher
            .hash(&request.new_password)
            .await?;
        user.set_password(password, self.deps.clock.now());
        let user = self.deps.user_repository.update(user).await?;

        self.deps.otp_store.delete_otp(&key).await?;
        self.deps.otp_store.reset_attempts(&key).await?;

        info!(user_id = %user.id, "通过 OTP 重置密码");
        Ok(ResetPasswordResponseDto {
            success: true,
            message: "Mật khẩu đã được đặt lại thành công. Bạn có thể đăng nhập với mật khẩu mới."
                .to_string(),
        })
    }

    async fn find_user(&self, email: &str) -> Result<User, ApplicationError> {
        let email = Email::parse(email)?;
        self.deps
            .user_repository
            .find_by_email(&email)
            .await?
            .ok_or_else(|| ApplicationError::not_found("user", email.as_str()))
    }

    async fn ensure_can_send(&self, key: &str) -> Result<(), ApplicationError> {
        let attempts = self.deps.otp_store.send_attempts(key).await?;
        if attempts >= OTP_MAX_SENDS {
            return Err(ApplicationError::business_rule(format!(
                "Bạn đã gửi OTP quá {attempts} lần. Vui lòng thử lại sau 15 phút."
            )));
        }
        Ok(())
    }

    async fn otp_matches(&self, key: &str, otp: &str) -> Result<bool, ApplicationError> {
        Ok(self
            .deps
            .otp_store
            .get_otp(key)
            .await?
            .is_some_and(|stored| stored == otp.trim()))
    }

    /// 生成并保存 OTP、计数加一、后台发送邮件，返回剩余发送次数。
    async fn send_new_otp(&self, user: &User, key: &str) -> Result<u32, ApplicationError> {
        let otp = generate_otp();
        self.deps.otp_store.save_otp(key, &otp, OTP_TTL).await?;
        let attempts = self
            .deps
            .otp_store
            .increment_attempts(key, OTP_RATE_LIMIT_WINDOW)
            .await?;

        let mailer = Arc::clone(&self.deps.mailer);
        let to = user.email.clone();
        let name = user.name.clone();
        tokio::spawn(async move {
            if let Err(err) = mailer.send_otp(&to, &name, &otp).await {
                warn!(error = %err, email = %to, "发送 OTP 邮件失败");
            }
        });

        info!(user_id = %user.id, attempts, "已生成密码重置 OTP");
        Ok(OTP_MAX_SENDS.saturating_sub(attempts))
    }
}

/// OTP 相关键统一使用小写邮箱
fn otp_key(email: &Email) -> String {
    email.as_str().to_lowercase()
}
