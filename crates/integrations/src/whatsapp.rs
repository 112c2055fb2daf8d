use super::ensure_success;
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://api.z-api.io";

/// One Z-API WhatsApp instance.
#[derive(Clone)]
pub struct WhatsAppClient {
    pub base_url: String,
    instance_id: String,
    instance_token: String,
    client_token: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SendText<'a> {
    phone: &'a str,
    message: &'a str,
}

impl WhatsAppClient {
    pub fn new(
        base_url: String,
        instance_id: String,
        instance_token: String,
        client_token: String,
    ) -> Arc<Self> {
        Arc::new(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            instance_id,
            instance_token,
            client_token,
            http_client: reqwest::Client::new(),
        })
    }

    fn send_text_url(&self) -> String {
        format!(
            "{}/instances/{}/token/{}/send-text",
            self.base_url, self.instance_id, self.instance_token
        )
    }

    /// `phone` is in provider format: country code, no `+`.
    pub async fn send_text(&self, phone: &str, message: &str) -> Result<()> {
        let resp = self
            .http_client
            .post(self.send_text_url())
            .header("Client-Token", &self.client_token)
            .json(&SendText { phone, message })
            .send()
            .await
            .context("Failed to send WhatsApp message")?;
        ensure_success(resp, "WhatsApp send").await?;
        Ok(())
    }
}
