use async_trait::async_trait;
use serde_json::Value;
use visionpay_core::models::{Amount, PaymentMethod};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    pub method: PaymentMethod,
    pub amount: Amount,
    pub phone: String,
    pub reference: String,
}

/// Body returned by the gateway on success, forwarded verbatim to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub body: Value,
}

impl GatewayResponse {
    /// Number the gateway actually debited, when it reports one.
    pub fn payer_msisdn(&self) -> Option<String> {
        ["msisdn", "payerPhone", "debited_msisdn"]
            .iter()
            .find_map(|k| self.body.get(*k).and_then(visionpay_core::models::scalar_text))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway rejected payment ({status}): {detail}")]
    Rejected {
        status: u16,
        detail: String,
        body: Value,
    },
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("no wallet configured for {0}")]
    NotConfigured(PaymentMethod),
    #[error("{0}")]
    Simulated(String),
}

impl GatewayError {
    /// Message shown to the payer: the gateway's own `message` when it sent
    /// one, otherwise a description of what went wrong.
    pub fn detail(&self) -> String {
        match self {
            GatewayError::Rejected { detail, .. } => detail.clone(),
            GatewayError::Transport(e) => e.to_string(),
            GatewayError::NotConfigured(method) => format!("no wallet configured for {method}"),
            GatewayError::Simulated(msg) => msg.clone(),
        }
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, req: &ChargeRequest) -> Result<GatewayResponse, GatewayError>;
}

pub mod e2payments;
pub mod mock;
