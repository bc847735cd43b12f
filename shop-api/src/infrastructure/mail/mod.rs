//! 邮件发送
//!
//! 配置了 `[smtp]` 时通过 SMTP 发送，否则只把邮件内容写入日志，便于本地开发。

mod smtp;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::AppError;

pub use smtp::SmtpMailer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), AppError>;
}

/// 未配置 SMTP 时使用
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
        // 正文带有效令牌，只在 debug 级别输出
        tracing::info!(to = %mail.to, subject = %mail.subject, "SMTP not configured, mail logged only");
        tracing::debug!(to = %mail.to, body = %mail.html, "Unsent mail body");
        Ok(())
    }
}

pub fn init_mailer(config: &Config) -> Result<Arc<dyn Mailer>, AppError> {
    match &config.smtp {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, port = smtp.port, "Initializing SMTP mailer");
            Ok(Arc::new(SmtpMailer::new(smtp)?))
        }
        None => {
            tracing::warn!("No [smtp] section configured, falling back to log mailer");
            Ok(Arc::new(LogMailer))
        }
    }
}

/// 用户填写的内容写入 HTML 前转义
fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
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

pub fn verification_mail(frontend_url: &str, to: &str, name: &str, token: &str) -> OutgoingMail {
    let name = escape_html(name);
    let link = format!("{}/verify-email?token={}", frontend_url.trim_end_matches('/'), token);
    OutgoingMail {
        to: to.to_string(),
        subject: "Verify your email".to_string(),
        html: format!(
            "<p>Hello {name},</p>\
             <p>Please confirm your email address by opening the link below. It expires in 24 hours.</p>\
             <p><a href=\"{link}\">{link}</a></p>"
        ),
    }
}

pub fn password_reset_mail(frontend_url: &str, to: &str, name: &str, token: &str) -> OutgoingMail {
    let name = escape_html(name);
    let link = format!("{}/reset-password?token={}", frontend_url.trim_end_matches('/'), token);
    OutgoingMail {
        to: to.to_string(),
        subject: "Reset your password".to_string(),
        html: format!(
            "<p>Hello {name},</p>\
             <p>Use the link below to choose a new password. It expires in 1 hour.</p>\
             <p><a href=\"{link}\">{link}</a></p>\
             <p>If you did not request this, you can ignore this email.</p>"
        ),
    }
}
