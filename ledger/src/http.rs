//! HTTP client for a ledger anchoring endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{AnchorRecord, LedgerAdapter, LedgerError, ReceiptId};

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Anchors records with `POST {endpoint}/anchors`.
///
/// The endpoint answers `{"receipt_id": "..."}` on success.
pub struct HttpLedgerAdapter {
    endpoint: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct AnchorResponse {
    receipt_id: String,
}

impl HttpLedgerAdapter {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .build()
            .unwrap_or_default();
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            http_client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LedgerAdapter for HttpLedgerAdapter {
    async fn anchor(&self, record: &AnchorRecord) -> Result<ReceiptId, LedgerError> {
        let url = format!("{}/anchors", self.endpoint);

        let response = self
            .http_client
            .post(&url)
            .json(record)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LedgerError::Unreachable(format!("request timed out: {e}"))
                } else if e.is_connect() {
                    LedgerError::Unreachable(format!("connection failed: {e}"))
                } else {
                    LedgerError::Unreachable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: AnchorResponse = response.json().await.map_err(|e| {
            LedgerError::InvalidResponse(format!("failed to parse anchor response: {e}"))
        })?;
        if parsed.receipt_id.is_empty() {
            return Err(LedgerError::InvalidResponse("empty receipt id".into()));
        }
        Ok(ReceiptId(parsed.receipt_id))
    }
}
