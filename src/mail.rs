use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::config::MailConfig;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> anyhow::Result<()>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> anyhow::Result<()> {
        info!(to = %message.to, subject = %message.subject, body = %message.text, "mail not delivered (no relay configured)");
        Ok(())
    }
}

/// Hands messages to an HTTP mail relay as JSON.
#[derive(Clone)]
pub struct RelayMailer {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl RelayMailer {
    pub fn new(url: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
            token,
        }
    }
}

#[async_trait]
impl Mailer for RelayMailer {
    async fn send(&self, message: &MailMessage) -> anyhow::Result<()> {
        let mut req = self.client.post(&self.url).json(message);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req.send()
            .await
            .context("mail relay request")?
            .error_for_status()
            .context("mail relay response")?;
        info!(to = %message.to, subject = %message.subject, "mail handed to relay");
        Ok(())
    }
}

pub fn from_config(cfg: &MailConfig) -> Arc<dyn Mailer> {
    match &cfg.relay_url {
        Some(url) => Arc::new(RelayMailer::new(url, cfg.relay_token.clone())),
        None => Arc::new(LogMailer),
    }
}

pub fn verification_email(cfg: &MailConfig, to: &str, token: &str) -> MailMessage {
    let link = format!("{}/verify?token={}", cfg.frontend_url, token);
    MailMessage {
        from: cfg.from.clone(),
        to: to.to_string(),
        subject: "Verify your email".into(),
        text: format!("Please verify your email by clicking the following link: {link}"),
    }
}

pub fn password_reset_email(cfg: &MailConfig, to: &str, token: &str) -> MailMessage {
    let link = format!("{}/reset-password?token={}", cfg.frontend_url, token);
    MailMessage {
        from: cfg.from.clone(),
        to: to.to_string(),
        subject: "Password Reset Request".into(),
        text: format!(
            "You requested a password reset. Click the link to reset your password: {link}"
        ),
    }
}
