use super::ensure_success;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Internal sale alerts through Pushcut notification URLs. Each URL is
/// triggered with an empty POST, in order.
#[derive(Clone)]
pub struct PushNotifier {
    urls: Vec<String>,
    http_client: reqwest::Client,
}

impl PushNotifier {
    pub fn new(urls: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            urls,
            http_client: reqwest::Client::new(),
        })
    }

    async fn trigger(&self, url: &str) -> Result<()> {
        let resp = self
            .http_client
            .post(url)
            .send()
            .await
            .context("Failed to trigger push notification")?;
        ensure_success(resp, "Push notification").await?;
        Ok(())
    }

    /// Triggers every URL; one failure does not stop the others. Returns
    /// how many succeeded.
    pub async fn notify_sale(&self) -> usize {
        let mut delivered = 0;
        for (idx, url) in self.urls.iter().enumerate() {
            match self.trigger(url).await {
                Ok(()) => {
                    delivered += 1;
                    tracing::info!(notification = idx + 1, "Push notification sent");
                }
                Err(e) => {
                    tracing::error!(notification = idx + 1, error = %e, "Push notification failed")
                }
            }
        }
        delivered
    }
}
