//! Outbound side-effect clients used after a payment is accepted.
//!
//! Every client is a thin JSON-over-HTTP wrapper; callers decide whether a
//! failure matters (in the checkout flow it never does).

use anyhow::{bail, Result};

pub mod mail;
pub mod push;
pub mod sheets;
pub mod sms;
pub mod tracking;
pub mod whatsapp;

/// Fails with the status line and body when `resp` is not a 2xx.
pub(crate) async fn ensure_success(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("{} failed: {} - {}", what, status, body);
    }
    Ok(resp)
}
