//! Substrate adapter dispatching XCM messages through relayers

use super::{dispatch_failed, tx_hash_or_fallback, CrossChainAdapter, DispatchRequest, Verification};
use crate::chain::{ChainConnection, PolkadotBridge, Protocol};
use crate::config::RelayerConfig;
use crate::coordination::TransactionStatus;
use crate::error::{InteropError, InteropResult};
use crate::transport::Transport;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Message type used when a send carries no transaction type
pub const DEFAULT_MESSAGE_TYPE: &str = "BatchData";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayerStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubstrateRelayerInfo {
    pub relayer_id: String,
    pub network_address: String,
    pub public_key: String,
    pub status: RelayerStatus,
    pub last_heartbeat: DateTime<Utc>,
    pub supported_chains: Vec<String>,
}

impl SubstrateRelayerInfo {
    pub fn serves(&self, chain_id: &str) -> bool {
        self.status == RelayerStatus::Active && self.supported_chains.iter().any(|c| c == chain_id)
    }
}

impl From<&RelayerConfig> for SubstrateRelayerInfo {
    fn from(config: &RelayerConfig) -> Self {
        Self {
            relayer_id: config.relayer_id.clone(),
            network_address: config.network_address.clone(),
            public_key: config.public_key.clone(),
            status: config.status,
            last_heartbeat: Utc::now(),
            supported_chains: config.supported_chains.clone(),
        }
    }
}

/// Known relayers, ordered by relayer ID
pub struct RelayerTable {
    enabled: AtomicBool,
    relayers: RwLock<BTreeMap<String, SubstrateRelayerInfo>>,
}

impl RelayerTable {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            relayers: RwLock::new(BTreeMap::new()),
        }
    }

    /// Enable Substrate messaging and replace the relayer table
    pub async fn enable(&self, relayers: &[RelayerConfig]) {
        let table: BTreeMap<_, _> = relayers
            .iter()
            .map(|r| (r.relayer_id.clone(), SubstrateRelayerInfo::from(r)))
            .collect();

        *self.relayers.write().await = table;
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// First active relayer that lists `chain_id`
    pub async fn select(&self, chain_id: &str) -> Option<SubstrateRelayerInfo> {
        self.relayers
            .read()
            .await
            .values()
            .find(|r| r.serves(chain_id))
            .cloned()
    }

    pub async fn set_relayer_status(&self, relayer_id: &str, status: RelayerStatus) -> InteropResult<()> {
        let mut relayers = self.relayers.write().await;
        let relayer = relayers
            .get_mut(relayer_id)
            .ok_or_else(|| InteropError::Config(format!("Relayer {} is not configured", relayer_id)))?;

        if relayer.status != status {
            info!("Relayer {} is now {:?}", relayer_id, status);
            relayer.status = status;
        }
        Ok(())
    }

    pub async fn record_relayer_heartbeat(&self, relayer_id: &str) -> InteropResult<DateTime<Utc>> {
        let mut relayers = self.relayers.write().await;
        let relayer = relayers
            .get_mut(relayer_id)
            .ok_or_else(|| InteropError::Config(format!("Relayer {} is not configured", relayer_id)))?;

        relayer.last_heartbeat = Utc::now();
        debug!("Heartbeat from relayer {}", relayer_id);
        Ok(relayer.last_heartbeat)
    }

    pub async fn list(&self) -> Vec<SubstrateRelayerInfo> {
        self.relayers.read().await.values().cloned().collect()
    }
}

impl Default for RelayerTable {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SubstrateAdapter {
    relayers: RelayerTable,
    transport: Arc<dyn Transport>,
}

impl SubstrateAdapter {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            relayers: RelayerTable::new(),
            transport,
        }
    }

    pub fn relayers(&self) -> &RelayerTable {
        &self.relayers
    }

    fn polkadot_bridge<'a>(&self, chain: &'a ChainConnection) -> InteropResult<&'a PolkadotBridge> {
        chain
            .polkadot_bridge
            .as_ref()
            .ok_or_else(|| InteropError::NoBridgeConfigured {
                chain_id: chain.chain_id.clone(),
            })
    }
}

#[async_trait]
impl CrossChainAdapter for SubstrateAdapter {
    fn protocol(&self) -> Protocol {
        Protocol::Substrate
    }

    async fn send(&self, request: DispatchRequest<'_>) -> InteropResult<String> {
        let dest_chain_id = &request.destination.chain_id;
        if !self.relayers.is_enabled() {
            return Err(InteropError::ProtocolNotEnabled {
                protocol: Protocol::Substrate,
                chain_id: dest_chain_id.clone(),
            });
        }

        let relayer = self
            .relayers
            .select(dest_chain_id)
            .await
            .ok_or_else(|| InteropError::NoActiveRelayer {
                chain_id: dest_chain_id.clone(),
            })?;
        debug!("Selected relayer {} for {}", relayer.relayer_id, dest_chain_id);

        let bridge = self.polkadot_bridge(request.destination)?;

        let message_type = if request.tx_type.is_empty() {
            DEFAULT_MESSAGE_TYPE
        } else {
            request.tx_type
        };

        let envelope = json!({
            "source_chain_id": request.source_chain_id,
            "dest_chain_id": dest_chain_id,
            "message_type": message_type,
            "payload": request.payload,
            "source_tx_id": request.source_tx_id,
            "timestamp": Utc::now().to_rfc3339(),
            "relayer_id": relayer.relayer_id,
            "parachain_id": bridge.parachain_id,
        });

        let url = format!("{}/xcm/send", bridge.relay_endpoint);
        let response = self
            .transport
            .post_json(&url, &envelope, bridge.api_key.as_deref())
            .await
            .map_err(|e| dispatch_failed(Protocol::Substrate, e))?;

        let tx_id = tx_hash_or_fallback(&response, "xcm", request.source_tx_id);
        info!(
            "XCM message sent to {} via relayer {}: {}",
            dest_chain_id, relayer.relayer_id, tx_id
        );
        Ok(tx_id)
    }

    async fn verify(
        &self,
        tx_id: &str,
        source_chain_id: &str,
        destination: &ChainConnection,
    ) -> InteropResult<Verification> {
        let bridge = self.polkadot_bridge(destination)?;
        let url = format!("{}/api/xcm/verify/{}", bridge.parachain_endpoint, tx_id);
        let body = json!({
            "source_chain_id": source_chain_id,
            "dest_chain_id": destination.chain_id,
        });

        let response = self
            .transport
            .post_json(&url, &body, bridge.api_key.as_deref())
            .await
            .map_err(|e| dispatch_failed(Protocol::Substrate, e))?;

        let verified = response
            .get("verified")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let proof = match (&response, verified) {
            (Value::Object(map), true) => map.clone(),
            _ => Map::new(),
        };
        Ok(Verification { verified, proof })
    }

    async fn status(
        &self,
        tx_id: &str,
        chain: &ChainConnection,
    ) -> InteropResult<TransactionStatus> {
        let bridge = self.polkadot_bridge(chain)?;
        let url = format!("{}/api/xcm/message/{}", bridge.parachain_endpoint, tx_id);

        let response = self
            .transport
            .get_json(&url, bridge.api_key.as_deref())
            .await
            .map_err(|e| dispatch_failed(Protocol::Substrate, e))?;

        let status = match response.get("status").and_then(Value::as_str) {
            Some("executed") => TransactionStatus::Completed,
            Some("failed") => {
                warn!("XCM message {} failed on {}", tx_id, chain.chain_id);
                TransactionStatus::Failed
            }
            _ => TransactionStatus::Pending,
        };
        Ok(status)
    }
}
