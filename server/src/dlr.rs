//! SMS delivery-report ingestion.

use chrono::Utc;
use serde_json::{json, Value};
use store::audit::AuditEvent;
use store::collections;
use visionpay_core::models::{delivery_reports, DeliveryReport};

use crate::state::AppState;

/// Parses a callback body leniently: anything that is not JSON counts as an
/// empty report list.
pub fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Delivery report body is not JSON");
        Value::Null
    })
}

fn log_update(report: &DeliveryReport) -> Value {
    json!({
        "dlr": {
            "status": report.status,
            "description": report.description,
            "raw": report.raw,
            "updated_at": Utc::now().to_rfc3339(),
        }
    })
}

/// Merges every usable report into the SMS log and returns how many were
/// stored. Entries without a recipient or correlation id are skipped.
pub async fn ingest(state: &AppState, body: &Value) -> usize {
    let mut stored = 0;
    for report in delivery_reports(body) {
        let Some(key) = report.log_key() else {
            tracing::debug!("Delivery report without recipient or id, skipping");
            continue;
        };
        match state
            .store
            .merge(collections::SMS_LOGS, &key, log_update(&report))
            .await
        {
            Ok(()) => {
                stored += 1;
                tracing::info!(
                    key = %key,
                    status = report.status.as_deref().unwrap_or_default(),
                    "Delivery report stored"
                );
                let mut event = AuditEvent::new(
                    "dlr_received",
                    report.correlation_id.as_deref().unwrap_or_default(),
                    report.status.as_deref().unwrap_or("UNKNOWN"),
                );
                if let Some(to) = &report.to {
                    event = event.with_recipient(to.clone());
                }
                state.audit.record(event);
            }
            Err(e) => tracing::error!(key = %key, error = %e, "Storing delivery report failed"),
        }
    }
    stored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bodies_parse_to_null() {
        assert_eq!(parse_body(b""), Value::Null);
        assert_eq!(parse_body(b"not json"), Value::Null);
        assert_eq!(parse_body(br#"{"results":[]}"#), json!({ "results": [] }));
    }

    #[test]
    fn update_nests_status_under_dlr() {
        let report = DeliveryReport::from_value(&json!({
            "to": "258841234567",
            "callbackData": "TX1",
            "status": { "groupName": "DELIVERED", "description": "Message delivered" }
        }));
        let update = log_update(&report);
        assert_eq!(update["dlr"]["status"], "DELIVERED");
        assert_eq!(update["dlr"]["description"], "Message delivered");
        assert_eq!(update["dlr"]["raw"]["callbackData"], "TX1");
        assert!(update["dlr"]["updated_at"].is_string());
    }
}
