//! Base single-chain ledger client consumed by the generic bridge

use crate::error::{InteropError, InteropResult};
use crate::transport::Transport;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Submits a typed transaction to the local ledger and returns its id
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn submit_transaction(
        &self,
        tx_type: &str,
        payload: Map<String, Value>,
    ) -> InteropResult<String>;
}

/// Ledger client that forwards submissions to the relay service
pub struct RelayLedgerClient {
    relay_endpoint: String,
    transport: Arc<dyn Transport>,
}

impl RelayLedgerClient {
    pub fn new(relay_endpoint: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            relay_endpoint: relay_endpoint.into().trim_end_matches('/').to_string(),
            transport,
        }
    }

    fn submit_url(&self) -> String {
        format!("{}/ledger/transactions", self.relay_endpoint)
    }
}

#[async_trait]
impl LedgerClient for RelayLedgerClient {
    async fn submit_transaction(
        &self,
        tx_type: &str,
        payload: Map<String, Value>,
    ) -> InteropResult<String> {
        let url = self.submit_url();
        let body = serde_json::json!({
            "tx_type": tx_type,
            "payload": payload,
        });

        debug!("Submitting {} to ledger relay {}", tx_type, url);
        let response = self
            .transport
            .post_json(&url, &body, None)
            .await
            .map_err(|e| InteropError::Internal(format!("ledger submission failed: {}", e)))?;

        let tx_id = ["tx_id", "tx_hash"]
            .iter()
            .find_map(|key| response.get(*key).and_then(Value::as_str))
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                InteropError::Internal(format!("ledger relay {} returned no transaction id", url))
            })?;

        info!("Ledger accepted {} as {}", tx_type, tx_id);
        Ok(tx_id.to_string())
    }
}

/// Ledger client used when no relay endpoint is configured
pub struct UnconfiguredLedger;

#[async_trait]
impl LedgerClient for UnconfiguredLedger {
    async fn submit_transaction(
        &self,
        tx_type: &str,
        _payload: Map<String, Value>,
    ) -> InteropResult<String> {
        Err(InteropError::Config(format!(
            "cannot submit {}: engine.relay_endpoint is not configured",
            tx_type
        )))
    }
}
