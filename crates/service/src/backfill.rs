use std::time::Duration;

use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use serde::Serialize;
use tracing::warn;

/// Parameters the upstream indexer's `statediff_writeStateDiffAt` expects
/// alongside the target height — what to include in the statediff it writes.
#[derive(Debug, Clone, Serialize)]
pub struct StateDiffParams {
    #[serde(rename = "includeBlock")]
    pub include_block: bool,
    #[serde(rename = "includeReceipts")]
    pub include_receipts: bool,
    #[serde(rename = "includeTD")]
    pub include_td: bool,
    #[serde(rename = "includeCode")]
    pub include_code: bool,
}

impl Default for StateDiffParams {
    fn default() -> Self {
        StateDiffParams { include_block: true, include_receipts: true, include_td: true, include_code: true }
    }
}

/// A fire-and-forget client for prompting the upstream node to backfill a
/// gap in the index. No response payload is interpreted beyond error/no-error.
pub struct BackfillClient {
    client: HttpClient,
    timeout: Duration,
}

impl BackfillClient {
    pub fn new(http_path: &str, timeout: Duration) -> Result<Self, jsonrpsee::core::ClientError> {
        let client = HttpClientBuilder::default().request_timeout(timeout).build(http_path)?;
        Ok(BackfillClient { client, timeout })
    }

    /// Invokes the backfill RPC for `block_number`. Failures (including
    /// timeout) are logged and treated as non-fatal by the caller — a
    /// missing block stays missing until the next retry regardless of how
    /// this call went.
    pub async fn request(&self, block_number: u64) {
        let params = StateDiffParams::default();
        let result = tokio::time::timeout(
            self.timeout,
            self.client.request::<serde_json::Value, _>("statediff_writeStateDiffAt", rpc_params![block_number, params]),
        )
        .await;

        match result {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => warn!(block_number, error = %err, "backfill rpc call failed"),
            Err(_) => warn!(block_number, timeout = ?self.timeout, "backfill rpc call timed out"),
        }
    }
}
