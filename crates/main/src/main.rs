//! TalentBridge 服务入口
//!
//! 加载配置、连接外部依赖、组装应用服务，然后启动 HTTP 服务与定时任务。

use std::{env, path::PathBuf, sync::Arc};

use anyhow::Context;
use application::services::vnpay::VnPaySigner;
use application::*;
use config::AppConfig;
use infrastructure::{start_scheduler, Infrastructure};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, HttpSettings, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = load_config()?;
    let infra = Infrastructure::connect(&config)
        .await
        .context("连接外部依赖失败")?;

    let state = build_state(&config, &infra);
    state
        .role_service
        .verify_builtin_roles()
        .await
        .context("内置角色检查失败")?;

    let mut scheduler = start_scheduler(
        state.job_service.clone(),
        state.subscriber_service.clone(),
    )
    .await?;

    let app = router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("无法监听 {addr}"))?;

    info!("TalentBridge 启动在 http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await?;
    info!("服务已停止");
    Ok(())
}

/// `APP_CONFIG` 指定可选的 YAML 文件；`APP_ENV=production` 时校验失败直接退出
fn load_config() -> anyhow::Result<AppConfig> {
    let path = env::var("APP_CONFIG").ok();
    let config = AppConfig::load(path.as_deref())?;

    let production = env::var("APP_ENV").is_ok_and(|value| value.eq_ignore_ascii_case("production"));
    match config.validate() {
        Ok(()) => {}
        Err(err) if production => return Err(err.into()),
        Err(err) => warn!(error = %err, "配置未通过生产校验，使用开发默认值继续"),
    }
    Ok(config)
}

fn build_state(config: &AppConfig, infra: &Infrastructure) -> AppState {
    let db = &infra.storage;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtService::new(config.jwt.clone()));

    let notification_service = Arc::new(NotificationService::new(
        NotificationServiceDependencies {
            notification_repository: db.notification_repository.clone(),
            user_repository: db.user_repository.clone(),
            company_repository: db.company_repository.clone(),
            clock: clock.clone(),
        },
    ));

    AppState {
        auth_service: Arc::new(AuthService::new(AuthServiceDependencies {
            user_repository: db.user_repository.clone(),
            role_repository: db.role_repository.clone(),
            password_hasher: infra.password_hasher.clone(),
            token_codec: token_codec.clone(),
            refresh_tokens: infra.refresh_tokens.clone(),
            clock: clock.clone(),
        })),
        password_reset_service: Arc::new(PasswordResetService::new(
            PasswordResetServiceDependencies {
                user_repository: db.user_repository.clone(),
                otp_store: infra.otp_store.clone(),
                password_hasher: infra.password_hasher.clone(),
                mailer: infra.mailer.clone(),
                clock: clock.clone(),
            },
        )),
        user_service: Arc::new(UserService::new(UserServiceDependencies {
            user_repository: db.user_repository.clone(),
            company_repository: db.company_repository.clone(),
            role_repository: db.role_repository.clone(),
            resume_repository: db.resume_repository.clone(),
            password_hasher: infra.password_hasher.clone(),
            file_storage: infra.files.clone(),
            clock: clock.clone(),
        })),
        role_service: Arc::new(RoleService::new(RoleServiceDependencies {
            role_repository: db.role_repository.clone(),
            permission_repository: db.permission_repository.clone(),
            clock: clock.clone(),
        })),
        company_service: Arc::new(CompanyService::new(CompanyServiceDependencies {
            company_repository: db.company_repository.clone(),
            user_repository: db.user_repository.clone(),
            resume_repository: db.resume_repository.clone(),
            file_storage: infra.files.clone(),
            clock: clock.clone(),
        })),
        skill_service: Arc::new(SkillService::new(SkillServiceDependencies {
            skill_repository: db.skill_repository.clone(),
            clock: clock.clone(),
        })),
        job_service: Arc::new(JobService::new(JobServiceDependencies {
            job_repository: db.job_repository.clone(),
            company_repository: db.company_repository.clone(),
            skill_repository: db.skill_repository.clone(),
            user_repository: db.user_repository.clone(),
            resume_repository: db.resume_repository.clone(),
            file_storage: infra.files.clone(),
            clock: clock.clone(),
        })),
        resume_service: Arc::new(ResumeService::new(ResumeServiceDependencies {
            resume_repository: db.resume_repository.clone(),
            job_repository: db.job_repository.clone(),
            company_repository: db.company_repository.clone(),
            user_repository: db.user_repository.clone(),
            file_storage: infra.files.clone(),
            notifications: notification_service.clone(),
            mailer: infra.mailer.clone(),
            clock: clock.clone(),
        })),
        notification_service,
        payment_service: Arc::new(PaymentService::new(PaymentServiceDependencies {
            payment_repository: db.payment_repository.clone(),
            job_repository: db.job_repository.clone(),
            user_repository: db.user_repository.clone(),
            resume_repository: db.resume_repository.clone(),
            signer: VnPaySigner::new(&config.vnpay),
            clock: clock.clone(),
        })),
        chat_service: Arc::new(ChatService::new(ChatServiceDependencies {
            chat_repository: db.chat_message_repository.clone(),
            history_cache: infra.chat_cache.clone(),
            llm: infra.llm.clone(),
            user_repository: db.user_repository.clone(),
            clock: clock.clone(),
        })),
        subscriber_service: Arc::new(SubscriberService::new(SubscriberServiceDependencies {
            subscriber_repository: db.subscriber_repository.clone(),
            skill_repository: db.skill_repository.clone(),
            job_repository: db.job_repository.clone(),
            company_repository: db.company_repository.clone(),
            user_repository: db.user_repository.clone(),
            mailer: infra.mailer.clone(),
            clock,
        })),
        token_codec,
        settings: Arc::new(HttpSettings {
            frontend_url: config.server.frontend_url.clone(),
            cors_origins: config.server.cors_origins.clone(),
            files_dir: Some(PathBuf::from(&config.storage.root_dir)),
        }),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "无法监听 Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("收到停止信号，正在关闭");
}
