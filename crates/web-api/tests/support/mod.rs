//! 集成测试环境：内存仓储 + 真实 JWT，路由跑在随机端口上。

#![allow(dead_code)]

use std::sync::Arc;

use application::memory::{
    CannedLlm, InMemoryDatabase, MemoryChatHistoryCache, MemoryFileStorage, MemoryOtpStore,
    MemoryRefreshTokenStore, PlainPasswordHasher, RecordingMailer,
};
use application::services::vnpay::VnPaySigner;
use application::*;
use chrono::{Duration, Utc};
use config::{JwtConfig, VnPayConfig};
use domain::{
    Company, CompanyDetails, CompanyId, Email, Job, JobDetails, JobId, JobLevel, JobStatus,
    PasswordHash, PermissionId, User, UserId, UserProfile, ROLE_ADMIN, ROLE_RECRUITER, ROLE_USER,
};
use reqwest::{header, redirect::Policy, Response};
use serde_json::{json, Value};
use web_api::{router, AppState, HttpSettings, JwtService, REFRESH_COOKIE};

pub const PASSWORD: &str = "secret123";
pub const FRONTEND_URL: &str = "http://frontend.test";

/// 各内置角色在测试中拥有的权限
const GRANTS: &[(&str, &[(&str, &str)])] = &[
    (
        ROLE_ADMIN,
        &[
            ("GET", "/users"),
            ("POST", "/jobs"),
            ("GET", "/resumes"),
            ("POST", "/skills"),
        ],
    ),
    (
        ROLE_USER,
        &[
            ("POST", "/resumes"),
            ("GET", "/resumes/me"),
            ("GET", "/notifications/unread-count"),
        ],
    ),
    (
        ROLE_RECRUITER,
        &[
            ("GET", "/resumes/company"),
            ("GET", "/notifications/unread-count"),
            ("GET", "/notifications/latest"),
        ],
    ),
];

pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub db: Arc<InMemoryDatabase>,
    pub files: Arc<MemoryFileStorage>,
    pub mailer: Arc<RecordingMailer>,
    pub signer: VnPaySigner,
}

fn vnpay_config() -> VnPayConfig {
    VnPayConfig {
        tmn_code: "TESTCODE".into(),
        hash_secret: "integration-secret".into(),
        pay_url: "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".into(),
        return_url: "http://localhost/api/v1/payments/vnpay-return".into(),
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let db = Arc::new(InMemoryDatabase::new());
        let files = Arc::new(MemoryFileStorage::default());
        let mailer = Arc::new(RecordingMailer::default());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let hasher: Arc<dyn PasswordHasher> = Arc::new(PlainPasswordHasher);
        let signer = VnPaySigner::new(&vnpay_config());
        let tokens: Arc<dyn TokenCodec> = Arc::new(JwtService::new(JwtConfig {
            secret: "integration-test-secret".into(),
            access_token_expiration_secs: 600,
            refresh_token_expiration_secs: 3600,
        }));

        let role_service = Arc::new(RoleService::new(RoleServiceDependencies {
            role_repository: db.clone(),
            permission_repository: db.clone(),
            clock: clock.clone(),
        }));
        seed_roles(&role_service).await;

        let notification_service = Arc::new(NotificationService::new(
            NotificationServiceDependencies {
                notification_repository: db.clone(),
                user_repository: db.clone(),
                company_repository: db.clone(),
                clock: clock.clone(),
            },
        ));

        let state = AppState {
            auth_service: Arc::new(AuthService::new(AuthServiceDependencies {
                user_repository: db.clone(),
                role_repository: db.clone(),
                password_hasher: hasher.clone(),
                token_codec: tokens.clone(),
                refresh_tokens: Arc::new(MemoryRefreshTokenStore::default()),
                clock: clock.clone(),
            })),
            password_reset_service: Arc::new(PasswordResetService::new(
                PasswordResetServiceDependencies {
                    user_repository: db.clone(),
                    otp_store: Arc::new(MemoryOtpStore::default()),
                    password_hasher: hasher.clone(),
                    mailer: mailer.clone(),
                    clock: clock.clone(),
                },
            )),
            user_service: Arc::new(UserService::new(UserServiceDependencies {
                user_repository: db.clone(),
                company_repository: db.clone(),
                role_repository: db.clone(),
                resume_repository: db.clone(),
                password_hasher: hasher.clone(),
                file_storage: files.clone(),
                clock: clock.clone(),
            })),
            role_service,
            company_service: Arc::new(CompanyService::new(CompanyServiceDependencies {
                company_repository: db.clone(),
                user_repository: db.clone(),
                resume_repository: db.clone(),
                file_storage: files.clone(),
                clock: clock.clone(),
            })),
            skill_service: Arc::new(SkillService::new(SkillServiceDependencies {
                skill_repository: db.clone(),
                clock: clock.clone(),
            })),
            job_service: Arc::new(JobService::new(JobServiceDependencies {
                job_repository: db.clone(),
                company_repository: db.clone(),
                skill_repository: db.clone(),
                user_repository: db.clone(),
                resume_repository: db.clone(),
                file_storage: files.clone(),
                clock: clock.clone(),
            })),
            resume_service: Arc::new(ResumeService::new(ResumeServiceDependencies {
                resume_repository: db.clone(),
                job_repository: db.clone(),
                company_repository: db.clone(),
                user_repository: db.clone(),
                file_storage: files.clone(),
                notifications: notification_service.clone(),
                mailer: mailer.clone(),
                clock: clock.clone(),
            })),
            notification_service,
            payment_service: Arc::new(PaymentService::new(PaymentServiceDependencies {
                payment_repository: db.clone(),
                job_repository: db.clone(),
                user_repository: db.clone(),
                resume_repository: db.clone(),
                signer: signer.clone(),
                clock: clock.clone(),
            })),
            chat_service: Arc::new(ChatService::new(ChatServiceDependencies {
                chat_repository: db.clone(),
                history_cache: Arc::new(MemoryChatHistoryCache::default()),
                llm: Arc::new(CannedLlm::new("Hãy bắt đầu với Rust.")),
                user_repository: db.clone(),
                clock: clock.clone(),
            })),
            subscriber_service: Arc::new(SubscriberService::new(SubscriberServiceDependencies {
                subscriber_repository: db.clone(),
                skill_repository: db.clone(),
                job_repository: db.clone(),
                company_repository: db.clone(),
                user_repository: db.clone(),
                mailer: mailer.clone(),
                clock: clock.clone(),
            })),
            token_codec: tokens,
            settings: Arc::new(HttpSettings {
                frontend_url: FRONTEND_URL.into(),
                cors_origins: vec![FRONTEND_URL.into()],
                files_dir: None,
            }),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let app = router(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test app");
        });

        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .build()
            .expect("build client");

        Self {
            base_url: format!("http://{addr}"),
            client,
            db,
            files,
            mailer,
            signer,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    pub async fn register(&self, name: &str, email: &str, recruiter: bool) -> Response {
        self.client
            .post(self.url("/auth/register"))
            .json(&json!({
                "name": name,
                "email": email,
                "password": PASSWORD,
                "recruiter": recruiter,
            }))
            .send()
            .await
            .expect("register request")
    }

    /// 登录并返回 (访问令牌, 刷新令牌)
    pub async fn login(&self, email: &str) -> (String, String) {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": PASSWORD }))
            .send()
            .await
            .expect("login request");
        assert_eq!(response.status(), 200, "login {email}");
        let refresh = refresh_cookie_of(&response).expect("refresh cookie");
        let body: Value = response.json().await.expect("login body");
        let access = body["accessToken"]
            .as_str()
            .expect("access token")
            .to_string();
        (access, refresh)
    }

    /// 直接写库创建管理员，注册接口只发放普通角色
    pub async fn admin(&self, email: &str) -> User {
        self.user_with_role("Admin", email, ROLE_ADMIN).await
    }

    pub async fn user_with_role(&self, name: &str, email: &str, role: &str) -> User {
        let role = RoleRepository::find_by_name(self.db.as_ref(), role)
            .await
            .expect("find role")
            .expect("seeded role");
        let user = User::register(
            UserId::generate(),
            UserProfile {
                name: name.into(),
                ..Default::default()
            },
            Email::parse(email).expect("valid email"),
            PasswordHash::new(format!("plain:{PASSWORD}")).expect("hash"),
            Some(role.id),
            Utc::now(),
        )
        .expect("valid user");
        UserRepository::create(self.db.as_ref(), user)
            .await
            .expect("create user")
    }

    pub async fn recruiter(&self, email: &str, company_id: CompanyId) -> User {
        let mut user = self.user_with_role("Recruiter", email, ROLE_RECRUITER).await;
        user.assign_company(Some(company_id), Utc::now());
        UserRepository::update(self.db.as_ref(), user)
            .await
            .expect("bind recruiter to company")
    }

    pub async fn company(&self, name: &str) -> Company {
        let company = Company::new(
            CompanyId::generate(),
            CompanyDetails {
                name: name.into(),
                description: None,
                address: Some("Hà Nội".into()),
            },
            None,
            Utc::now(),
        )
        .expect("valid company");
        CompanyRepository::create(self.db.as_ref(), company)
            .await
            .expect("create company")
    }

    /// 正在招聘的职位
    pub async fn open_job(&self, name: &str, company_id: Option<CompanyId>) -> Job {
        let now = Utc::now();
        let details = JobDetails {
            name: name.into(),
            location: "Hà Nội".into(),
            salary: 2_000.0,
            quantity: 1,
            level: JobLevel::Fresher,
            description: "Rust backend".into(),
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(30),
            status: JobStatus::Active,
        };
        let job = Job::new(JobId::generate(), details, company_id, Vec::new(), now)
            .expect("valid job");
        JobRepository::create(self.db.as_ref(), job)
            .await
            .expect("create job")
    }
}

async fn seed_roles(roles: &RoleService) {
    let mut created: Vec<(String, String, PermissionId)> = Vec::new();
    for (role, grants) in GRANTS {
        let mut permission_ids = Vec::new();
        for (method, path) in grants.iter() {
            let existing = created
                .iter()
                .find(|(m, p, _)| m == method && p == path)
                .map(|(_, _, id)| *id);
            let id = match existing {
                Some(id) => id,
                None => {
                    let permission = roles
                        .create_permission(PermissionRequest {
                            name: format!("{method} {path}"),
                            api_path: (*path).into(),
                            method: (*method).into(),
                            module: "TEST".into(),
                        })
                        .await
                        .expect("seed permission");
                    created.push((method.to_string(), path.to_string(), permission.id));
                    permission.id
                }
            };
            permission_ids.push(id);
        }
        roles
            .create_role(RoleRequest {
                name: (*role).into(),
                description: None,
                active: true,
                permission_ids,
            })
            .await
            .expect("seed role");
    }
}

/// 从 Set-Cookie 中取出刷新令牌
pub fn refresh_cookie_of(response: &Response) -> Option<String> {
    let prefix = format!("{REFRESH_COOKIE}=");
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| value.strip_prefix(&prefix))
        .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
}

pub fn cookie_header(refresh_token: &str) -> String {
    format!("{REFRESH_COOKIE}={refresh_token}")
}

/// 最小可识别的 PDF 内容
pub fn pdf_bytes() -> Vec<u8> {
    b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF\n".to_vec()
}
