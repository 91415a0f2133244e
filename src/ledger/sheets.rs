//! Spreadsheet-backed ledger client.
//!
//! Speaks the Sheets values API: `values:append` for writes (the returned
//! `updates.updatedRange` locator carries the appended row's position) and
//! `batchUpdate` with a `deleteDimension` request for undo. Every call has a
//! bounded timeout; a timed-out call is a failure, never retried here.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::domain::Order;

use super::{order_row, parse_row_pointer, Ledger, LedgerError, RowPointer};

/// Client for one spreadsheet tab.
pub struct SheetsLedger {
    endpoint: String,
    spreadsheet_id: String,
    tab: String,
    /// Numeric grid id of the tab, needed by deleteDimension
    sheet_gid: i64,
    api_token: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct AppendResponse {
    updates: Option<AppendUpdates>,
}

#[derive(Debug, Deserialize)]
struct AppendUpdates {
    #[serde(rename = "updatedRange")]
    updated_range: Option<String>,
}

impl SheetsLedger {
    pub fn new(
        endpoint: String,
        spreadsheet_id: String,
        tab: String,
        sheet_gid: i64,
        api_token: String,
        timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        Ok(Self {
            endpoint,
            spreadsheet_id,
            tab,
            sheet_gid,
            api_token,
            client,
        })
    }

    fn append_url(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}:append?valueInputOption=RAW",
            self.endpoint, self.spreadsheet_id, self.tab
        )
    }

    fn batch_update_url(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}:batchUpdate",
            self.endpoint, self.spreadsheet_id
        )
    }

    async fn post(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, LedgerError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LedgerError::Rejected(format!("{}: {}", status, detail)));
        }

        Ok(response)
    }
}

fn classify_transport(e: reqwest::Error) -> LedgerError {
    if e.is_timeout() {
        LedgerError::Timeout
    } else {
        LedgerError::Transport(e.to_string())
    }
}

#[async_trait]
impl Ledger for SheetsLedger {
    async fn append(&self, order: &Order) -> Result<RowPointer, LedgerError> {
        let body = serde_json::json!({ "values": [order_row(order)] });

        let response = self.post(&self.append_url(), body).await?;

        let parsed: AppendResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let locator = parsed
            .updates
            .and_then(|u| u.updated_range)
            .ok_or_else(|| LedgerError::BadLocator(String::new()))?;

        let row = parse_row_pointer(&locator)?;
        debug!(%row, locator, "ledger append acknowledged");
        Ok(row)
    }

    async fn delete_row(&self, row: RowPointer) -> Result<(), LedgerError> {
        // deleteDimension takes a 0-based half-open row range.
        let body = serde_json::json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": self.sheet_gid,
                        "dimension": "ROWS",
                        "startIndex": row.0 - 1,
                        "endIndex": row.0,
                    }
                }
            }]
        });

        self.post(&self.batch_update_url(), body).await?;
        debug!(%row, "ledger row deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> SheetsLedger {
        SheetsLedger::new(
            "https://sheets.example.com".to_string(),
            "SHEET_ID".to_string(),
            "Orders".to_string(),
            0,
            "TOKEN".to_string(),
            Duration::from_secs(10),
        )
        .unwrap()
    }

    #[test]
    fn test_append_url() {
        assert_eq!(
            ledger().append_url(),
            "https://sheets.example.com/v4/spreadsheets/SHEET_ID/values/Orders:append?valueInputOption=RAW"
        );
    }

    #[test]
    fn test_batch_update_url() {
        assert_eq!(
            ledger().batch_update_url(),
            "https://sheets.example.com/v4/spreadsheets/SHEET_ID:batchUpdate"
        );
    }
}
