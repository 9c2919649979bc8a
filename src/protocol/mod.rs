//! Protocol adapters
//!
//! Each cross-chain protocol is an adapter exposing send, verify and status.
//! The engine selects one per destination chain with an exhaustive match on
//! [`Protocol`].

pub mod bridge;
pub mod ibc;
pub mod substrate;

pub use bridge::GenericBridgeAdapter;
pub use ibc::{ChannelState, ChannelTable, IbcAdapter, IbcChannelInfo};
pub use substrate::{RelayerStatus, RelayerTable, SubstrateAdapter, SubstrateRelayerInfo};

use crate::chain::{ChainConnection, Protocol};
use crate::coordination::TransactionStatus;
use crate::error::{InteropError, InteropResult};
use crate::standard::Payload;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::fmt::Display;

/// Everything an adapter needs to dispatch one transaction
#[derive(Debug, Clone, Copy)]
pub struct DispatchRequest<'a> {
    pub source_chain_id: &'a str,
    pub destination: &'a ChainConnection,
    pub tx_type: &'a str,
    pub payload: &'a Payload,
    pub source_tx_id: &'a str,
}

/// Outcome of a verification query
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub verified: bool,
    pub proof: Map<String, Value>,
}

#[async_trait]
pub trait CrossChainAdapter: Send + Sync {
    fn protocol(&self) -> Protocol;

    /// Dispatch a transaction and return the destination transaction id
    async fn send(&self, request: DispatchRequest<'_>) -> InteropResult<String>;

    /// Ask the destination whether a transaction arrived
    async fn verify(
        &self,
        tx_id: &str,
        source_chain_id: &str,
        destination: &ChainConnection,
    ) -> InteropResult<Verification>;

    /// Query the status of a transaction on `chain`
    async fn status(&self, tx_id: &str, chain: &ChainConnection)
        -> InteropResult<TransactionStatus>;
}

/// Synthetic destination id used when a remote answer carries no `tx_hash`.
///
/// Format: `<prefix>-<first 8 chars of source id>-<YYYYMMDDhhmmss>`.
pub fn fallback_tx_id(prefix: &str, source_tx_id: &str, now: DateTime<Utc>) -> String {
    let short = source_tx_id.get(..8).unwrap_or(source_tx_id);
    format!("{}-{}-{}", prefix, short, now.format("%Y%m%d%H%M%S"))
}

/// Destination id from a remote answer, or the labelled fallback
pub(crate) fn tx_hash_or_fallback(response: &Value, prefix: &str, source_tx_id: &str) -> String {
    match response.get("tx_hash").and_then(Value::as_str) {
        Some(hash) if !hash.is_empty() => hash.to_string(),
        _ => fallback_tx_id(prefix, source_tx_id, Utc::now()),
    }
}

pub(crate) fn dispatch_failed(protocol: Protocol, error: impl Display) -> InteropError {
    InteropError::DispatchFailed {
        protocol,
        message: error.to_string(),
    }
}
