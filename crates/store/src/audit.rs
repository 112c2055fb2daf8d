use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event_type: String,
    pub reference: String,
    pub state: String,
    pub method: Option<String>,
    pub amount: Option<String>,
    pub recipient: Option<String>,
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: &str, reference: &str, state: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            event_type: event_type.to_string(),
            reference: reference.to_string(),
            state: state.to_string(),
            method: None,
            amount: None,
            recipient: None,
            error: None,
        }
    }

    pub fn with_payment(mut self, method: &str, amount: &str) -> Self {
        self.method = Some(method.to_string());
        self.amount = Some(amount.to_string());
        self
    }

    pub fn with_recipient(mut self, recipient: String) -> Self {
        self.recipient = Some(recipient);
        self
    }

    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }
}

/// Append-only JSON-lines trail of payment outcomes.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: Option<PathBuf>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn write(&self, event: &AuditEvent) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        let json = serde_json::to_string(event)?;
        writeln!(file, "{}", json)?;
        tracing::debug!(event_type=%event.event_type, reference=%event.reference, "Audit event written");
        Ok(())
    }

    /// Writes the event, logging instead of failing.
    pub fn record(&self, event: AuditEvent) {
        if let Err(e) = self.write(&event) {
            tracing::warn!(error=%e, event_type=%event.event_type, "Failed to write audit event");
        }
    }
}
