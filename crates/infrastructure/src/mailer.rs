//! SMTP 邮件发送
//!
//! 正文渲染与发送分开：`render_*` 是纯函数，便于单独测试；
//! [`SmtpMailer`] 只负责组装 MIME 消息并交给 lettre 的异步传输。

use application::{ApplicationError, JobDigestItem, Mailer, ResumeStatusMail};
use async_trait::async_trait;
use config::MailConfig;
use domain::{Email, ResumeStatus};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("无效的邮件地址: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("邮件构建失败: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP 发送失败: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

impl From<MailerError> for ApplicationError {
    fn from(err: MailerError) -> Self {
        ApplicationError::infrastructure(err.to_string())
    }
}

pub const OTP_SUBJECT: &str = "Mã OTP Khôi Phục Mật Khẩu";
pub const DIGEST_SUBJECT: &str = "🔥 Cơ hội việc làm mới dành cho bạn!";

pub fn resume_status_subject(job_name: &str) -> String {
    format!("📋 Cập nhật trạng thái ứng tuyển - {job_name}")
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    frontend_url: String,
}

impl SmtpMailer {
    /// 用户名为空时不做认证也不启用 TLS，适合本地 MailHog 之类的调试服务器
    pub fn new(config: &MailConfig, frontend_url: impl Into<String>) -> Result<Self, MailerError> {
        let transport = if config.username.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                .port(config.smtp_port)
                .credentials(Credentials::new(
                    config.username.clone(),
                    config.password.clone(),
                ))
                .build()
        };

        Ok(Self {
            transport,
            from: config.from.parse()?,
            frontend_url: frontend_url.into(),
        })
    }

    async fn send_html(&self, to: &Email, subject: &str, html: String) -> Result<(), MailerError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.as_str().parse()?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)?;

        self.transport.send(message).await?;
        debug!(to = %to, subject, "邮件已发送");
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_otp(&self, to: &Email, name: &str, otp: &str) -> Result<(), ApplicationError> {
        self.send_html(to, OTP_SUBJECT, render_otp(name, otp)).await?;
        Ok(())
    }

    async fn send_job_digest(
        &self,
        to: &Email,
        name: &str,
        jobs: &[JobDigestItem],
    ) -> Result<(), ApplicationError> {
        let html = render_job_digest(name, jobs, &self.frontend_url);
        self.send_html(to, DIGEST_SUBJECT, html).await?;
        info!(to = %to, jobs = jobs.len(), "职位推荐邮件已发送");
        Ok(())
    }

    async fn send_resume_status(&self, mail: &ResumeStatusMail) -> Result<(), ApplicationError> {
        let subject = resume_status_subject(&mail.job_name);
        self.send_html(&mail.to, &subject, render_resume_status(mail))
            .await?;
        Ok(())
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// 越南盾金额，千分位用点号，例如 `15.000.000 ₫`
pub fn format_salary(amount: f64) -> String {
    let digits = format!("{:.0}", amount.max(0.0));
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    format!("{grouped} ₫")
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<style>
  body {{ font-family: Arial, sans-serif; background-color: #f4f4f4; margin: 0; padding: 20px; }}
  .container {{ max-width: 600px; margin: 0 auto; background-color: #ffffff; padding: 30px; border-radius: 10px; }}
  .info {{ color: #666666; line-height: 1.6; }}
  .footer {{ text-align: center; color: #999999; font-size: 12px; margin-top: 30px; }}
</style>
</head>
<body>
<div class="container">
  <h2 style="text-align: center; color: #333333;">{title}</h2>
  {body}
  <div class="footer"><p>Email này được gửi tự động, vui lòng không trả lời.</p></div>
</div>
</body>
</html>"#
    )
}

pub fn render_otp(name: &str, otp: &str) -> String {
    let body = format!(
        r#"<p class="info">Xin chào <strong>{name}</strong>,</p>
  <p class="info">Bạn đã yêu cầu khôi phục mật khẩu. Dưới đây là mã OTP của bạn:</p>
  <div style="background-color: #f0f0f0; padding: 20px; text-align: center; border-radius: 5px;">
    <div style="font-size: 32px; font-weight: bold; color: #4CAF50; letter-spacing: 5px;">{otp}</div>
  </div>
  <p class="info">Mã OTP này có hiệu lực trong <strong>5 phút</strong>.</p>
  <p style="color: #ff6b6b; font-weight: bold;">⚠️ Nếu bạn không yêu cầu khôi phục mật khẩu, vui lòng bỏ qua email này.</p>"#,
        name = escape_html(name),
        otp = escape_html(otp),
    );
    layout("🔐 Khôi Phục Mật Khẩu", &body)
}

pub fn render_job_digest(name: &str, jobs: &[JobDigestItem], frontend_url: &str) -> String {
    let base = frontend_url.trim_end_matches('/');
    let cards: String = jobs
        .iter()
        .map(|job| {
            let company = job
                .company_name
                .as_deref()
                .map(|c| format!("<div>🏢 {}</div>", escape_html(c)))
                .unwrap_or_default();
            let skills = if job.skills.is_empty() {
                String::new()
            } else {
                format!("<div>🛠 {}</div>", escape_html(&job.skills.join(", ")))
            };
            format!(
                r#"<div style="border: 1px solid #eeeeee; border-radius: 8px; padding: 16px; margin: 12px 0;">
    <h3 style="margin: 0 0 8px 0;">{name}</h3>
    {company}
    <div>📍 {location}</div>
    <div>💰 {salary}</div>
    {skills}
    <a href="{base}/jobs/{id}" style="display: inline-block; margin-top: 8px; color: #ffffff; background-color: #4CAF50; padding: 8px 16px; border-radius: 4px; text-decoration: none;">Xem chi tiết</a>
  </div>"#,
                name = escape_html(&job.name),
                location = escape_html(&job.location),
                salary = format_salary(job.salary),
                id = job.id,
            )
        })
        .collect();

    let body = format!(
        r#"<p class="info">Xin chào <strong>{name}</strong>,</p>
  <p class="info">Dưới đây là những công việc mới phù hợp với kỹ năng của bạn:</p>
  {cards}"#,
        name = escape_html(name),
    );
    layout("🔥 Việc làm mới dành cho bạn", &body)
}

/// 状态对应的文案、颜色与图标
pub fn status_info(status: ResumeStatus) -> (&'static str, &'static str, &'static str, &'static str) {
    match status {
        ResumeStatus::Pending => (
            "Đang xem xét",
            "#FFA500",
            "⏳",
            "Hồ sơ của bạn đang được xem xét bởi nhà tuyển dụng.",
        ),
        ResumeStatus::Reviewing => (
            "Đang đánh giá",
            "#2196F3",
            "👀",
            "Nhà tuyển dụng đang đánh giá chi tiết hồ sơ của bạn.",
        ),
        ResumeStatus::Approved => (
            "Được chấp nhận",
            "#4CAF50",
            "✅",
            "Chúc mừng! Hồ sơ của bạn đã được chấp nhận. Nhà tuyển dụng sẽ liên hệ với bạn sớm.",
        ),
        ResumeStatus::Rejected => (
            "Không phù hợp",
            "#F44336",
            "❌",
            "Rất tiếc, lần này hồ sơ của bạn chưa phù hợp với vị trí này. Đừng nản chí, hãy tiếp tục tìm kiếm cơ hội khác!",
        ),
    }
}

pub fn render_resume_status(mail: &ResumeStatusMail) -> String {
    let (text, color, icon, message) = status_info(mail.status);
    let company = mail
        .company_name
        .as_deref()
        .map(|c| format!(r#"<p class="info">Công ty: <strong>{}</strong></p>"#, escape_html(c)))
        .unwrap_or_default();

    let body = format!(
        r#"<p class="info">Xin chào <strong>{name}</strong>,</p>
  <p class="info">Vị trí: <strong>{job}</strong></p>
  {company}
  <div style="padding: 16px; border-radius: 5px; text-align: center; color: #ffffff; background-color: {color};">
    {icon} {text}
  </div>
  <p class="info">{message}</p>"#,
        name = escape_html(&mail.applicant_name),
        job = escape_html(&mail.job_name),
    );
    layout("📋 Cập nhật trạng thái ứng tuyển", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{JobId, JobLevel};

    fn item(name: &str) -> JobDigestItem {
        JobDigestItem {
            id: JobId::generate(),
            name: name.to_string(),
            company_name: Some("Acme & Co".to_string()),
            location: "Hà Nội".to_string(),
            salary: 15_000_000.0,
            level: JobLevel::Middle,
            skills: vec!["Rust".to_string(), "SQL".to_string()],
        }
    }

    #[test]
    fn test_otp_body_contains_code_and_escaped_name() {
        let html = render_otp("<An>", "123456");
        assert!(html.contains("123456"));
        assert!(html.contains("&lt;An&gt;"));
        assert!(html.contains("5 phút"));
    }

    #[test]
    fn test_digest_links_every_job() {
        let jobs = vec![item("Backend"), item("Platform")];
        let html = render_job_digest("An", &jobs, "http://localhost:3000/");

        for job in &jobs {
            assert!(html.contains(&format!("http://localhost:3000/jobs/{}", job.id)));
        }
        assert!(html.contains("Acme &amp; Co"));
        assert!(html.contains("Rust, SQL"));
        assert!(html.contains("15.000.000 ₫"));
    }

    #[test]
    fn test_resume_status_uses_status_palette() {
        let mail = ResumeStatusMail {
            to: Email::parse("a@example.com").unwrap(),
            applicant_name: "An".to_string(),
            job_name: "Backend".to_string(),
            company_name: None,
            status: ResumeStatus::Approved,
        };
        let html = render_resume_status(&mail);
        assert!(html.contains("Được chấp nhận"));
        assert!(html.contains("#4CAF50"));
        assert!(!html.contains("Công ty"));
        assert_eq!(
            resume_status_subject("Backend"),
            "📋 Cập nhật trạng thái ứng tuyển - Backend"
        );
    }

    #[test]
    fn test_salary_grouping() {
        assert_eq!(format_salary(0.0), "0 ₫");
        assert_eq!(format_salary(999.0), "999 ₫");
        assert_eq!(format_salary(1_000.0), "1.000 ₫");
        assert_eq!(format_salary(12_345_678.4), "12.345.678 ₫");
    }

    #[test]
    fn test_mailer_rejects_bad_sender() {
        let config = MailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            username: String::new(),
            password: String::new(),
            from: "not an address".to_string(),
        };
        assert!(matches!(
            SmtpMailer::new(&config, "http://localhost:3000"),
            Err(MailerError::Address(_))
        ));
    }
}
