use super::ensure_success;
use anyhow::{Context, Result};
use serde_json::json;
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4";

/// Appends purchase rows to a Google Sheets spreadsheet.
#[derive(Clone)]
pub struct SheetsClient {
    pub base_url: String,
    spreadsheet_id: String,
    range: String,
    access_token: String,
    http_client: reqwest::Client,
}

impl SheetsClient {
    pub fn new(
        base_url: String,
        spreadsheet_id: String,
        range: String,
        access_token: String,
    ) -> Arc<Self> {
        Arc::new(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id,
            range,
            access_token,
            http_client: reqwest::Client::new(),
        })
    }

    fn append_url(&self) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}:append",
            self.base_url, self.spreadsheet_id, self.range
        )
    }

    /// Raw values, inserted as a new row after the last filled one.
    pub async fn append_row(&self, row: Vec<String>) -> Result<()> {
        let resp = self
            .http_client
            .post(self.append_url())
            .bearer_auth(&self.access_token)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "values": [row] }))
            .send()
            .await
            .context("Failed to append spreadsheet row")?;
        ensure_success(resp, "Spreadsheet append").await?;
        tracing::info!(spreadsheet_id = %self.spreadsheet_id, "Row appended to spreadsheet");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_url_targets_range() {
        let client = SheetsClient::new(
            DEFAULT_BASE_URL.to_string(),
            "sheet-1".into(),
            "A1".into(),
            "token".into(),
        );
        assert_eq!(
            client.append_url(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-1/values/A1:append"
        );
    }
}
