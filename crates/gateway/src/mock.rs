use super::{ChargeRequest, GatewayError, GatewayResponse, PaymentGateway};
use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use serde_json::json;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// Gateway stand-in for local runs: accepts every charge unless built with
/// [`MockGateway::failing`].
#[derive(Clone, Default)]
pub struct MockGateway {
    failure: Option<String>,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            failure: Some(message.into()),
        })
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn charge(&self, req: &ChargeRequest) -> Result<GatewayResponse, GatewayError> {
        // simulate network latency
        sleep(Duration::from_millis(50)).await;

        if let Some(message) = &self.failure {
            return Err(GatewayError::Simulated(message.clone()));
        }

        let transaction_id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();

        Ok(GatewayResponse {
            body: json!({
                "success": true,
                "transaction_id": transaction_id,
                "reference": req.reference,
                "amount": req.amount.as_str(),
                "method": req.method.as_str(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visionpay_core::models::{Amount, PaymentMethod};

    fn charge() -> ChargeRequest {
        ChargeRequest {
            method: PaymentMethod::Mpesa,
            amount: Amount::new("197"),
            phone: "841234567".into(),
            reference: "R1".into(),
        }
    }

    #[tokio::test]
    async fn accepts_by_default() {
        let resp = MockGateway::new().charge(&charge()).await.unwrap();
        assert_eq!(resp.body["reference"], "R1");
        assert_eq!(resp.body["transaction_id"].as_str().unwrap().len(), 16);
    }

    #[tokio::test]
    async fn failing_mock_reports_its_message() {
        let err = MockGateway::failing("saldo insuficiente")
            .charge(&charge())
            .await
            .unwrap_err();
        assert_eq!(err.detail(), "saldo insuficiente");
    }
}
