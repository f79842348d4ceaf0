//! 定时任务
//!
//! 使用 tokio-cron-scheduler，六段式 cron 表达式（含秒），按 UTC 计算。

use std::sync::Arc;

use application::{JobService, SubscriberService};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{error, info};

/// 每天 00:00 过期截止日期已过的职位
pub const EXPIRE_JOBS_CRON: &str = "0 0 0 * * *";
/// 每天 08:00 发送职位推荐邮件
pub const JOB_DIGEST_CRON: &str = "0 0 8 * * *";

/// 注册全部定时任务并启动调度器，返回的调度器用于关闭。
pub async fn start_scheduler(
    jobs: Arc<JobService>,
    subscribers: Arc<SubscriberService>,
) -> Result<JobScheduler, JobSchedulerError> {
    let mut scheduler = JobScheduler::new().await?;

    scheduler
        .add(Job::new_async(EXPIRE_JOBS_CRON, move |_uuid, _l| {
            let jobs = jobs.clone();
            Box::pin(async move {
                if let Err(e) = jobs.expire_overdue().await {
                    error!("职位过期任务失败: {}", e);
                }
            })
        })?)
        .await?;

    scheduler
        .add(Job::new_async(JOB_DIGEST_CRON, move |_uuid, _l| {
            let subscribers = subscribers.clone();
            Box::pin(async move {
                match subscribers.send_daily_digest().await {
                    Ok(report) => info!(
                        sent = report.sent,
                        skipped = report.skipped,
                        failed = report.failed,
                        "职位推荐邮件任务完成"
                    ),
                    Err(e) => error!("职位推荐邮件任务失败: {}", e),
                }
            })
        })?)
        .await?;

    scheduler.start().await?;
    info!(
        expire = EXPIRE_JOBS_CRON,
        digest = JOB_DIGEST_CRON,
        "定时任务已启动"
    );
    Ok(scheduler)
}
