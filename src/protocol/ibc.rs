//! IBC adapter for Cosmos chains
//!
//! Packets go out over the first OPEN channel in the channel table. Receipt
//! verification and status queries use the Cosmos bridge attached to the
//! chain in question.

use super::{dispatch_failed, tx_hash_or_fallback, CrossChainAdapter, DispatchRequest, Verification};
use crate::chain::{ChainConnection, CosmosBridge, Protocol};
use crate::config::ChannelConfig;
use crate::coordination::TransactionStatus;
use crate::error::{InteropError, InteropResult};
use crate::transport::Transport;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Revision height used as the packet timeout height
pub const TIMEOUT_REVISION_HEIGHT: u64 = 10_000_000;

/// Wall-clock timeout applied to every packet
pub const PACKET_TIMEOUT_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelState {
    Open,
    Closed,
    Init,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutHeight {
    pub revision_number: u64,
    pub revision_height: u64,
}

impl Default for TimeoutHeight {
    fn default() -> Self {
        Self {
            revision_number: 0,
            revision_height: TIMEOUT_REVISION_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IbcChannelInfo {
    pub channel_id: String,
    pub port_id: String,
    pub counterparty_channel_id: String,
    pub counterparty_port_id: String,
    pub state: ChannelState,
    pub version: String,
    pub connection_hops: Vec<String>,
    pub timeout_height: TimeoutHeight,
}

impl From<&ChannelConfig> for IbcChannelInfo {
    fn from(config: &ChannelConfig) -> Self {
        Self {
            channel_id: config.channel_id.clone(),
            port_id: config.port_id.clone(),
            counterparty_channel_id: config.counterparty_channel_id.clone(),
            counterparty_port_id: config.counterparty_port_id.clone(),
            state: config.state,
            version: config.version.clone(),
            connection_hops: config.connection_hops.clone(),
            timeout_height: TimeoutHeight::default(),
        }
    }
}

/// IBC channel table, ordered by channel ID
pub struct ChannelTable {
    enabled: AtomicBool,
    channels: RwLock<BTreeMap<String, IbcChannelInfo>>,
}

impl ChannelTable {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            channels: RwLock::new(BTreeMap::new()),
        }
    }

    /// Enable IBC and replace the channel table
    pub async fn enable(&self, channels: &[ChannelConfig]) {
        let table: BTreeMap<_, _> = channels
            .iter()
            .map(|c| (c.channel_id.clone(), IbcChannelInfo::from(c)))
            .collect();

        *self.channels.write().await = table;
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// First OPEN channel in channel ID order
    pub async fn first_open(&self) -> Option<IbcChannelInfo> {
        self.channels
            .read()
            .await
            .values()
            .find(|c| c.state == ChannelState::Open)
            .cloned()
    }

    pub async fn set_channel_state(&self, channel_id: &str, state: ChannelState) -> InteropResult<()> {
        let mut channels = self.channels.write().await;
        let channel = channels.get_mut(channel_id).ok_or_else(|| {
            InteropError::Config(format!("IBC channel {} is not configured", channel_id))
        })?;

        if channel.state != state {
            info!(
                "IBC channel {} moved from {:?} to {:?}",
                channel_id, channel.state, state
            );
            channel.state = state;
        }
        Ok(())
    }

    pub async fn list(&self) -> Vec<IbcChannelInfo> {
        self.channels.read().await.values().cloned().collect()
    }
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self::new()
    }
}

pub struct IbcAdapter {
    channels: ChannelTable,
    transport: Arc<dyn Transport>,
}

impl IbcAdapter {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            channels: ChannelTable::new(),
            transport,
        }
    }

    pub fn channels(&self) -> &ChannelTable {
        &self.channels
    }

    fn cosmos_bridge<'a>(&self, chain: &'a ChainConnection) -> InteropResult<&'a CosmosBridge> {
        chain
            .cosmos_bridge
            .as_ref()
            .ok_or_else(|| InteropError::NoBridgeConfigured {
                chain_id: chain.chain_id.clone(),
            })
    }
}

#[async_trait]
impl CrossChainAdapter for IbcAdapter {
    fn protocol(&self) -> Protocol {
        Protocol::Ibc
    }

    async fn send(&self, request: DispatchRequest<'_>) -> InteropResult<String> {
        if !self.channels.is_enabled() {
            return Err(InteropError::ProtocolNotEnabled {
                protocol: Protocol::Ibc,
                chain_id: request.destination.chain_id.clone(),
            });
        }

        let channel = self
            .channels
            .first_open()
            .await
            .ok_or(InteropError::NoOpenChannel)?;
        debug!(
            "Selected IBC channel {}/{} for {}",
            channel.port_id, channel.channel_id, request.destination.chain_id
        );

        let timeout_timestamp = (Utc::now() + Duration::minutes(PACKET_TIMEOUT_MINUTES))
            .timestamp_nanos_opt()
            .unwrap_or(i64::MAX);

        let packet = json!({
            "source_port": channel.port_id,
            "source_channel": channel.channel_id,
            "destination_port": channel.counterparty_port_id,
            "destination_channel": channel.counterparty_channel_id,
            "data": {
                "source_chain_id": request.source_chain_id,
                "dest_chain_id": request.destination.chain_id,
                "tx_type": request.tx_type,
                "payload": request.payload,
                "source_tx_id": request.source_tx_id,
            },
            "timeout_height": channel.timeout_height,
            "timeout_timestamp": timeout_timestamp,
        });

        let url = format!("{}/ibc/packets", request.destination.endpoint);
        let api_key = request
            .destination
            .cosmos_bridge
            .as_ref()
            .and_then(|b| b.api_key.as_deref());

        let response = self
            .transport
            .post_json(&url, &packet, api_key)
            .await
            .map_err(|e| dispatch_failed(Protocol::Ibc, e))?;

        let tx_id = tx_hash_or_fallback(&response, "ibc", request.source_tx_id);
        info!(
            "IBC packet sent to {} over {}: {}",
            request.destination.chain_id, channel.channel_id, tx_id
        );
        Ok(tx_id)
    }

    async fn verify(
        &self,
        tx_id: &str,
        source_chain_id: &str,
        destination: &ChainConnection,
    ) -> InteropResult<Verification> {
        let bridge = self.cosmos_bridge(destination)?;
        let url = format!("{}/ibc/packets/verify", bridge.node_endpoint);
        let body = json!({
            "tx_hash": tx_id,
            "source_chain_id": source_chain_id,
            "dest_chain_id": destination.chain_id,
        });

        let response = self
            .transport
            .post_json(&url, &body, bridge.api_key.as_deref())
            .await
            .map_err(|e| dispatch_failed(Protocol::Ibc, e))?;

        let verified = response
            .get("received")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let proof = match (&response, verified) {
            (Value::Object(map), true) => map.clone(),
            _ => Map::new(),
        };

        debug!("IBC packet {} received on {}: {}", tx_id, destination.chain_id, verified);
        Ok(Verification { verified, proof })
    }

    async fn status(
        &self,
        tx_id: &str,
        chain: &ChainConnection,
    ) -> InteropResult<TransactionStatus> {
        let bridge = self.cosmos_bridge(chain)?;
        let url = format!("{}/cosmos/tx/v1beta1/txs/{}", bridge.node_endpoint, tx_id);

        let response = self
            .transport
            .get_json(&url, bridge.api_key.as_deref())
            .await
            .map_err(|e| dispatch_failed(Protocol::Ibc, e))?;

        let status = match response.pointer("/tx_response/code").and_then(Value::as_u64) {
            Some(0) => TransactionStatus::Completed,
            Some(code) => {
                warn!("IBC transaction {} failed with code {}", tx_id, code);
                TransactionStatus::Failed
            }
            None => TransactionStatus::Pending,
        };
        Ok(status)
    }
}
