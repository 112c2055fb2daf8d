use super::ensure_success;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SENDER: &str = "ServiceSMS";

/// Infobip SMS API client.
#[derive(Clone)]
pub struct SmsClient {
    pub base_url: String,
    api_key: String,
    sender: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct Destination<'a> {
    to: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutboundMessage<'a> {
    from: &'a str,
    destinations: [Destination<'a>; 1],
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_data: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    messages: [OutboundMessage<'a>; 1],
}

impl SmsClient {
    pub fn new(base_url: String, api_key: String, sender: String) -> Result<Arc<Self>> {
        let http_client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .context("Failed to create SMS HTTP client")?;

        Ok(Arc::new(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            sender,
            http_client,
        }))
    }

    /// Sends one SMS. `callback_data` comes back in delivery reports and is
    /// used to correlate them with the transaction.
    pub async fn send(&self, to: &str, text: &str, callback_data: Option<&str>) -> Result<Value> {
        let body = SendRequest {
            messages: [OutboundMessage {
                from: &self.sender,
                destinations: [Destination { to }],
                text,
                callback_data,
            }],
        };

        let resp = self
            .http_client
            .post(format!("{}/sms/2/text/advanced", self.base_url))
            .header("Authorization", format!("App {}", self.api_key))
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to send SMS")?;

        let resp = ensure_success(resp, "SMS send").await?;
        let text = resp.text().await.context("Failed to read SMS response")?;
        Ok(response_body(&text))
    }
}

/// The provider accepted the message once it answered 2xx; a body that is
/// not JSON is kept as text.
fn response_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
