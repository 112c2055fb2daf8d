use super::{ChargeRequest, GatewayError, GatewayResponse, PaymentGateway};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use visionpay_core::models::PaymentMethod;

pub const DEFAULT_BASE_URL: &str = "https://e2payments.explicador.co.mz";

/// Wallet and bearer token for one payment rail.
#[derive(Clone)]
pub struct WalletCredentials {
    pub wallet_id: String,
    pub token: String,
}

/// Client for the e2Payments C2B aggregator (M-Pesa and e-Mola).
#[derive(Clone)]
pub struct E2PaymentsClient {
    pub base_url: String,
    client_id: String,
    mpesa: Option<WalletCredentials>,
    emola: Option<WalletCredentials>,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct C2bRequest<'a> {
    client_id: &'a str,
    amount: &'a str,
    phone: &'a str,
    reference: &'a str,
}

impl E2PaymentsClient {
    pub fn new(
        base_url: String,
        client_id: String,
        mpesa: Option<WalletCredentials>,
        emola: Option<WalletCredentials>,
    ) -> Arc<Self> {
        Arc::new(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id,
            mpesa,
            emola,
            http_client: reqwest::Client::new(),
        })
    }

    fn wallet(&self, method: PaymentMethod) -> Option<&WalletCredentials> {
        match method {
            PaymentMethod::Mpesa => self.mpesa.as_ref(),
            PaymentMethod::Emola => self.emola.as_ref(),
        }
    }

    fn charge_url(&self, method: PaymentMethod, wallet_id: &str) -> String {
        format!("{}/v1/c2b/{}-payment/{}", self.base_url, method, wallet_id)
    }
}

/// Parses a response body as JSON, keeping non-JSON bodies as a string.
fn body_value(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

#[async_trait]
impl PaymentGateway for E2PaymentsClient {
    async fn charge(&self, req: &ChargeRequest) -> Result<GatewayResponse, GatewayError> {
        let wallet = self
            .wallet(req.method)
            .ok_or(GatewayError::NotConfigured(req.method))?;
        let url = self.charge_url(req.method, &wallet.wallet_id);

        let payload = C2bRequest {
            client_id: &self.client_id,
            amount: req.amount.as_str(),
            phone: &req.phone,
            reference: &req.reference,
        };

        let resp = self
            .http_client
            .post(&url)
            .bearer_auth(&wallet.token)
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        let body = body_value(resp.text().await?);

        if !status.is_success() {
            let detail = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| {
                    format!("Request failed with status code {}", status.as_u16())
                });
            tracing::warn!(
                method = %req.method,
                reference = %req.reference,
                status = status.as_u16(),
                "e2Payments rejected charge"
            );
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                detail,
                body,
            });
        }

        tracing::info!(
            method = %req.method,
            reference = %req.reference,
            "Charge accepted by e2Payments"
        );

        Ok(GatewayResponse { body })
    }
}
