use std::path::PathBuf;
use std::sync::Arc;

use application::{
    AuthService, ChatService, CompanyService, JobService, NotificationService,
    PasswordResetService, PaymentService, ResumeService, RoleService, SkillService,
    SubscriberService, TokenCodec, UserService,
};

/// 路由层自身需要的配置
#[derive(Debug, Clone, Default)]
pub struct HttpSettings {
    /// 支付回调后重定向的前端地址
    pub frontend_url: String,
    pub cors_origins: Vec<String>,
    /// 上传文件所在目录，挂载到 `/files`
    pub files_dir: Option<PathBuf>,
}

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub password_reset_service: Arc<PasswordResetService>,
    pub user_service: Arc<UserService>,
    pub role_service: Arc<RoleService>,
    pub company_service: Arc<CompanyService>,
    pub skill_service: Arc<SkillService>,
    pub job_service: Arc<JobService>,
    pub resume_service: Arc<ResumeService>,
    pub notification_service: Arc<NotificationService>,
    pub payment_service: Arc<PaymentService>,
    pub chat_service: Arc<ChatService>,
    pub subscriber_service: Arc<SubscriberService>,
    pub token_codec: Arc<dyn TokenCodec>,
    pub settings: Arc<HttpSettings>,
}
