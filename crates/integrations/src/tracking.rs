use super::ensure_success;
use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use visionpay_core::models::Amount;
use visionpay_core::parsing::{hashed_email, hashed_phone};

pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com";
const GRAPH_VERSION: &str = "v19.0";

/// Server-side purchase conversions for the ad platform's pixel.
#[derive(Clone)]
pub struct ConversionTracker {
    pub base_url: String,
    pixel_id: String,
    access_token: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Clone)]
pub struct PurchaseEvent<'a> {
    pub email: &'a str,
    pub phone: &'a str,
    pub amount: &'a Amount,
    pub fbp: Option<&'a str>,
    pub fbc: Option<&'a str>,
    /// Unix seconds.
    pub event_time: i64,
}

impl PurchaseEvent<'_> {
    pub fn payload(&self) -> Value {
        let mut user_data = Map::new();
        user_data.insert("em".into(), Value::String(hashed_email(self.email)));
        user_data.insert("ph".into(), Value::String(hashed_phone(self.phone)));
        if let Some(fbp) = self.fbp {
            user_data.insert("fbp".into(), Value::String(fbp.to_string()));
        }
        if let Some(fbc) = self.fbc {
            user_data.insert("fbc".into(), Value::String(fbc.to_string()));
        }

        json!({
            "data": [{
                "event_name": "Purchase",
                "event_time": self.event_time,
                "action_source": "website",
                "user_data": user_data,
                "custom_data": { "currency": "MZN", "value": self.amount.to_json() },
            }]
        })
    }
}

impl ConversionTracker {
    pub fn new(base_url: String, pixel_id: String, access_token: String) -> Arc<Self> {
        Arc::new(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            pixel_id,
            access_token,
            http_client: reqwest::Client::new(),
        })
    }

    pub async fn track_purchase(&self, event: &PurchaseEvent<'_>) -> Result<()> {
        let url = format!("{}/{}/{}/events", self.base_url, GRAPH_VERSION, self.pixel_id);
        let resp = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&event.payload())
            .send()
            .await
            .context("Failed to send purchase conversion")?;
        ensure_success(resp, "Conversion event").await?;
        tracing::info!(pixel_id = %self.pixel_id, "Purchase conversion sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visionpay_core::parsing::compute_sha256_hex;

    #[test]
    fn payload_hashes_identity_and_skips_missing_click_ids() {
        let amount = Amount::new("197");
        let event = PurchaseEvent {
            email: " Ana@Mail.com",
            phone: "+258 84 123 4567",
            amount: &amount,
            fbp: Some("fb.1.123"),
            fbc: None,
            event_time: 1_700_000_000,
        };
        let payload = event.payload();
        let data = &payload["data"][0];
        assert_eq!(data["event_name"], "Purchase");
        assert_eq!(data["event_time"], 1_700_000_000);
        assert_eq!(data["user_data"]["em"], compute_sha256_hex("ana@mail.com"));
        assert_eq!(data["user_data"]["ph"], compute_sha256_hex("258841234567"));
        assert_eq!(data["user_data"]["fbp"], "fb.1.123");
        assert!(data["user_data"].get("fbc").is_none());
        assert_eq!(data["custom_data"], json!({ "currency": "MZN", "value": 197 }));
    }
}
