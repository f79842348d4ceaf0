//! 服务测试共用的内存环境：预置内置角色，并提供构造实体与服务的快捷方法。

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use config::VnPayConfig;
use domain::{
    Company, CompanyDetails, CompanyId, Email, Job, JobDetails, JobId, JobLevel, JobStatus,
    PasswordHash, Role, RoleId, Skill, SkillId, Timestamp, User, UserId, UserProfile,
    BUILTIN_ROLES, ROLE_RECRUITER,
};

use crate::clock::FixedClock;
use crate::llm::LlmClient;
use crate::mailer::Mailer;
use crate::memory::{
    CannedLlm, FakeTokenCodec, InMemoryDatabase, MemoryChatHistoryCache, MemoryFileStorage,
    MemoryOtpStore, MemoryRefreshTokenStore, PlainPasswordHasher, RecordingMailer,
};
use crate::repository::{
    CompanyRepository, JobRepository, NotificationRepository, RoleRepository, SkillRepository,
    UserRepository,
};
use crate::storage::FileStorage;

use super::vnpay::VnPaySigner;
use super::*;

/// 测试的“当前时间”
pub(crate) fn now() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

/// 预置用户的明文密码
pub(crate) const PASSWORD: &str = "secret123";

pub(crate) fn vnpay_config() -> VnPayConfig {
    VnPayConfig {
        tmn_code: "857UW4LW".into(),
        hash_secret: "test-secret".into(),
        pay_url: "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".into(),
        return_url: "http://localhost:8080/api/v1/payments/vnpay-return".into(),
    }
}

pub(crate) fn job_details(name: &str) -> JobDetails {
    JobDetails {
        name: name.into(),
        location: "Hà Nội".into(),
        salary: 1_500.0,
        quantity: 2,
        level: JobLevel::Middle,
        description: "Phát triển backend".into(),
        start_date: now() - Duration::days(1),
        end_date: now() + Duration::days(30),
        status: JobStatus::Active,
    }
}

pub(crate) struct Fixture {
    pub db: Arc<InMemoryDatabase>,
    pub files: Arc<MemoryFileStorage>,
    pub mailer: Arc<RecordingMailer>,
    pub otp_store: Arc<MemoryOtpStore>,
    pub refresh_tokens: Arc<MemoryRefreshTokenStore>,
    pub chat_cache: Arc<MemoryChatHistoryCache>,
    pub tokens: Arc<FakeTokenCodec>,
    pub llm: Arc<CannedLlm>,
    pub clock: Arc<FixedClock>,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::at(now()).await
    }

    pub async fn at(time: Timestamp) -> Self {
        let fixture = Self {
            db: Arc::new(InMemoryDatabase::new()),
            files: Arc::new(MemoryFileStorage::default()),
            mailer: Arc::new(RecordingMailer::default()),
            otp_store: Arc::new(MemoryOtpStore::default()),
            refresh_tokens: Arc::new(MemoryRefreshTokenStore::default()),
            chat_cache: Arc::new(MemoryChatHistoryCache::default()),
            tokens: Arc::new(FakeTokenCodec::default()),
            llm: Arc::new(CannedLlm::new("Bạn nên học Rust.")),
            clock: Arc::new(FixedClock(time)),
        };
        for name in BUILTIN_ROLES {
            let role = Role::new(RoleId::generate(), name, None, true, time).unwrap();
            RoleRepository::create(fixture.db.as_ref(), role)
                .await
                .unwrap();
        }
        fixture
    }

    pub async fn role(&self, name: &str) -> Role {
        RoleRepository::find_by_name(self.db.as_ref(), name)
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn user(&self, name: &str, email: &str, role: &str) -> User {
        let role = self.role(role).await;
        let user = User::register(
            UserId::generate(),
            UserProfile {
                name: name.into(),
                ..Default::default()
            },
            Email::parse(email).unwrap(),
            PasswordHash::new(format!("plain:{PASSWORD}")).unwrap(),
            Some(role.id),
            self.clock.0,
        )
        .unwrap();
        UserRepository::create(self.db.as_ref(), user).await.unwrap()
    }

    /// 招聘者并绑定到公司
    pub async fn recruiter(&self, name: &str, email: &str, company_id: CompanyId) -> User {
        let mut user = self.user(name, email, ROLE_RECRUITER).await;
        user.assign_company(Some(company_id), self.clock.0);
        UserRepository::update(self.db.as_ref(), user).await.unwrap()
    }

    pub async fn company(&self, name: &str, owner_id: Option<UserId>) -> Company {
        let details = CompanyDetails {
            name: name.into(),
            description: None,
            address: Some("Hà Nội".into()),
        };
        let company = Company::new(CompanyId::generate(), details, owner_id, self.clock.0).unwrap();
        CompanyRepository::create(self.db.as_ref(), company)
            .await
            .unwrap()
    }

    pub async fn skill(&self, name: &str) -> Skill {
        let skill = Skill::new(SkillId::generate(), name, self.clock.0).unwrap();
        SkillRepository::create(self.db.as_ref(), skill).await.unwrap()
    }

    pub async fn job(&self, name: &str, company_id: Option<CompanyId>, skills: Vec<Skill>) -> Job {
        self.job_with(job_details(name), company_id, skills).await
    }

    pub async fn job_with(
        &self,
        details: JobDetails,
        company_id: Option<CompanyId>,
        skills: Vec<Skill>,
    ) -> Job {
        let job = Job::new(JobId::generate(), details, company_id, skills, self.clock.0).unwrap();
        JobRepository::create(self.db.as_ref(), job).await.unwrap()
    }

    pub async fn reload_user(&self, id: UserId) -> User {
        UserRepository::find_by_id(self.db.as_ref(), id)
            .await
            .unwrap()
            .unwrap()
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(AuthServiceDependencies {
            user_repository: self.db.clone(),
            role_repository: self.db.clone(),
            password_hasher: Arc::new(PlainPasswordHasher),
            token_codec: self.tokens.clone(),
            refresh_tokens: self.refresh_tokens.clone(),
            clock: self.clock.clone(),
        })
    }

    pub fn password_reset(&self) -> PasswordResetService {
        PasswordResetService::new(PasswordResetServiceDependencies {
            user_repository: self.db.clone(),
            otp_store: self.otp_store.clone(),
            password_hasher: Arc::new(PlainPasswordHasher),
            mailer: self.mailer.clone(),
            clock: self.clock.clone(),
        })
    }

    pub fn users(&self) -> UserService {
        UserService::new(UserServiceDependencies {
            user_repository: self.db.clone(),
            company_repository: self.db.clone(),
            role_repository: self.db.clone(),
            resume_repository: self.db.clone(),
            password_hasher: Arc::new(PlainPasswordHasher),
            file_storage: self.files.clone(),
            clock: self.clock.clone(),
        })
    }

    pub fn companies(&self) -> CompanyService {
        CompanyService::new(CompanyServiceDependencies {
            company_repository: self.db.clone(),
            user_repository: self.db.clone(),
            resume_repository: self.db.clone(),
            file_storage: self.files.clone(),
            clock: self.clock.clone(),
        })
    }

    pub fn roles(&self) -> RoleService {
        RoleService::new(RoleServiceDependencies {
            role_repository: self.db.clone(),
            permission_repository: self.db.clone(),
            clock: self.clock.clone(),
        })
    }

    pub fn skills(&self) -> SkillService {
        SkillService::new(SkillServiceDependencies {
            skill_repository: self.db.clone(),
            clock: self.clock.clone(),
        })
    }

    pub fn jobs(&self) -> JobService {
        JobService::new(JobServiceDependencies {
            job_repository: self.db.clone(),
            company_repository: self.db.clone(),
            skill_repository: self.db.clone(),
            user_repository: self.db.clone(),
            resume_repository: self.db.clone(),
            file_storage: self.files.clone(),
            clock: self.clock.clone(),
        })
    }

    pub fn notifications(&self) -> NotificationService {
        NotificationService::new(NotificationServiceDependencies {
            notification_repository: self.db.clone(),
            user_repository: self.db.clone(),
            company_repository: self.db.clone(),
            clock: self.clock.clone(),
        })
    }

    pub fn resumes(&self) -> ResumeService {
        self.resumes_with_mailer(self.mailer.clone())
    }

    pub fn resumes_with_mailer(&self, mailer: Arc<dyn Mailer>) -> ResumeService {
        self.resumes_with(self.files.clone(), self.db.clone(), mailer)
    }

    /// 替换文件存储、通知仓储或邮件端口，用于注入故障
    pub fn resumes_with(
        &self,
        file_storage: Arc<dyn FileStorage>,
        notification_repository: Arc<dyn NotificationRepository>,
        mailer: Arc<dyn Mailer>,
    ) -> ResumeService {
        let notifications = NotificationService::new(NotificationServiceDependencies {
            notification_repository,
            user_repository: self.db.clone(),
            company_repository: self.db.clone(),
            clock: self.clock.clone(),
        });
        ResumeService::new(ResumeServiceDependencies {
            resume_repository: self.db.clone(),
            job_repository: self.db.clone(),
            company_repository: self.db.clone(),
            user_repository: self.db.clone(),
            file_storage,
            notifications: Arc::new(notifications),
            mailer,
            clock: self.clock.clone(),
        })
    }

    pub fn payments(&self) -> PaymentService {
        PaymentService::new(PaymentServiceDependencies {
            payment_repository: self.db.clone(),
            job_repository: self.db.clone(),
            user_repository: self.db.clone(),
            resume_repository: self.db.clone(),
            signer: VnPaySigner::new(&vnpay_config()),
            clock: self.clock.clone(),
        })
    }

    pub fn chat(&self) -> ChatService {
        self.chat_with_llm(self.llm.clone())
    }

    pub fn chat_with_llm(&self, llm: Arc<dyn LlmClient>) -> ChatService {
        ChatService::new(ChatServiceDependencies {
            chat_repository: self.db.clone(),
            history_cache: self.chat_cache.clone(),
            llm,
            user_repository: self.db.clone(),
            clock: self.clock.clone(),
        })
    }

    pub fn subscribers(&self) -> SubscriberService {
        self.subscribers_with_mailer(self.mailer.clone())
    }

    pub fn subscribers_with_mailer(&self, mailer: Arc<dyn Mailer>) -> SubscriberService {
        SubscriberService::new(SubscriberServiceDependencies {
            subscriber_repository: self.db.clone(),
            skill_repository: self.db.clone(),
            job_repository: self.db.clone(),
            company_repository: self.db.clone(),
            user_repository: self.db.clone(),
            mailer,
            clock: self.clock.clone(),
        })
    }
}
