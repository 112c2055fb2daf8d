use super::ensure_success;
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;

pub const DEFAULT_API_URL: &str = "https://api.resend.com/emails";

/// Transactional email through an HTTP mail API (Resend-compatible body).
#[derive(Clone)]
pub struct MailClient {
    pub api_url: String,
    api_key: String,
    from: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SendEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl MailClient {
    pub fn new(api_url: String, api_key: String, from: String) -> Arc<Self> {
        Arc::new(Self {
            api_url,
            api_key,
            from,
            http_client: reqwest::Client::new(),
        })
    }

    pub async fn send_html(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        let body = SendEmail {
            from: &self.from,
            to: [to],
            subject,
            html,
        };
        let resp = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send email")?;
        ensure_success(resp, "Email delivery").await?;
        tracing::info!(subject, "Email sent");
        Ok(())
    }
}
