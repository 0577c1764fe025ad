use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::settings;

/// Delivers one-time signup codes.
#[async_trait]
pub trait OtpMailer: Send + Sync {
    async fn send_otp(
        &self,
        email: &str,
        otp: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), anyhow::Error>;
}

pub fn from_settings(settings: &settings::Mailer) -> Arc<dyn OtpMailer> {
    match &settings.webhook_url {
        Some(url) => Arc::new(WebhookMailer::new(url.clone())),
        None => Arc::new(LogMailer),
    }
}

/// Writes the code to the log. Used when no delivery webhook is configured.
pub struct LogMailer;

#[async_trait]
impl OtpMailer for LogMailer {
    async fn send_otp(
        &self,
        email: &str,
        otp: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), anyhow::Error> {
        log::info!("OTP for {} is {} (expires {})", email, otp, expires_at);
        Ok(())
    }
}

pub struct WebhookMailer {
    client: reqwest::Client,
    url: String,
}

impl WebhookMailer {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl OtpMailer for WebhookMailer {
    async fn send_otp(
        &self,
        email: &str,
        otp: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), anyhow::Error> {
        self.client
            .post(&self.url)
            .json(&json!({
                "to": email,
                "subject": "Your verification code",
                "otp": otp,
                "expiresAt": expires_at,
            }))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
