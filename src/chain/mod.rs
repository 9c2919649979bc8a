//! Chain module - registry of connected external chains
//!
//! This module provides:
//! - Chain registration with protocol classification
//! - Protocol-specific connection details
//! - Cosmos and Polkadot bridge handles per chain

pub mod bridge;
pub mod connection;

pub use bridge::{CosmosBridge, PolkadotBridge};
pub use connection::{ChainConnection, ChainStatus, Protocol};

use crate::error::{InteropError, InteropResult};

use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Parachain id given to substrate chains until a Polkadot bridge sets the real one
pub const DEFAULT_PARACHAIN_ID: &str = "2000";

/// Registry of all connected chains, indexed by chain ID
pub struct ChainRegistry {
    connections: RwLock<HashMap<String, ChainConnection>>,
}

impl ChainRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace a chain connection.
    ///
    /// Re-registering a known chain ID replaces the whole record, including
    /// its details and bridge handles. The caller is responsible for checking
    /// that `protocol` is enabled.
    pub async fn register(
        &self,
        chain_id: &str,
        chain_type: &str,
        endpoint: &str,
        protocol: Protocol,
    ) -> ChainConnection {
        let handle = Uuid::new_v4().simple().to_string();
        let connection_id = format!("{}-{}", chain_id, handle);
        let short = &handle[..8];

        let mut details = Map::new();
        match protocol {
            Protocol::Ibc => {
                details.insert(
                    "ibc_connection_id".into(),
                    Value::from(format!("connection-{}", short)),
                );
                details.insert(
                    "ibc_client_id".into(),
                    Value::from(format!("07-tendermint-{}", short)),
                );
            }
            Protocol::Substrate => {
                details.insert("parachain_id".into(), Value::from(DEFAULT_PARACHAIN_ID));
                details.insert(
                    "xcmp_channel_id".into(),
                    Value::from(format!("xcmp-{}", short)),
                );
            }
            Protocol::Bridge => {}
        }

        let connection = ChainConnection {
            chain_id: chain_id.to_string(),
            chain_type: chain_type.to_string(),
            endpoint: bridge::trim_endpoint(endpoint.to_string()),
            connection_id,
            protocol,
            status: ChainStatus::Active,
            last_sync: Utc::now(),
            details,
            cosmos_bridge: None,
            polkadot_bridge: None,
        };

        let previous = self
            .connections
            .write()
            .await
            .insert(chain_id.to_string(), connection.clone());

        if previous.is_some() {
            info!(
                "Re-registered chain {} ({}) via {}",
                chain_id, chain_type, protocol
            );
        } else {
            info!("Registered chain {} ({}) via {}", chain_id, chain_type, protocol);
        }

        connection
    }

    /// Get a snapshot of a chain connection
    pub async fn get(&self, chain_id: &str) -> InteropResult<ChainConnection> {
        self.connections
            .read()
            .await
            .get(chain_id)
            .cloned()
            .ok_or_else(|| InteropError::ChainNotRegistered {
                chain_id: chain_id.to_string(),
            })
    }

    /// Flat detail map for a chain
    pub async fn details(&self, chain_id: &str) -> InteropResult<Map<String, Value>> {
        self.get(chain_id).await.map(|c| c.detail_map())
    }

    /// All registered chains, ordered by chain ID
    pub async fn list(&self) -> Vec<ChainConnection> {
        let mut chains: Vec<_> = self.connections.read().await.values().cloned().collect();
        chains.sort_by(|a, b| a.chain_id.cmp(&b.chain_id));
        chains
    }

    /// Number of registered chains
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Attach a Cosmos bridge to a chain whose type mentions "cosmos"
    pub async fn attach_cosmos_bridge(
        &self,
        chain_id: &str,
        node_endpoint: &str,
        api_key: Option<String>,
        account_address: &str,
    ) -> InteropResult<CosmosBridge> {
        let mut connections = self.connections.write().await;
        let chain = connections
            .get_mut(chain_id)
            .ok_or_else(|| InteropError::ChainNotRegistered {
                chain_id: chain_id.to_string(),
            })?;

        if !chain.chain_type_contains("cosmos") {
            return Err(InteropError::InvalidChainType {
                chain_id: chain_id.to_string(),
                chain_type: chain.chain_type.clone(),
                expected: "Cosmos".to_string(),
            });
        }

        let bridge = CosmosBridge::new(node_endpoint, chain_id, api_key, account_address);
        chain.details.insert(
            "cosmos_node_endpoint".into(),
            Value::from(bridge.node_endpoint.clone()),
        );
        chain.cosmos_bridge = Some(bridge.clone());

        info!("Created Cosmos bridge for chain {}", chain_id);
        Ok(bridge)
    }

    /// Attach a Polkadot bridge to a chain whose type mentions "polkadot" or "substrate"
    pub async fn attach_polkadot_bridge(
        &self,
        chain_id: &str,
        relay_endpoint: &str,
        relay_chain_id: &str,
        parachain_id: &str,
        api_key: Option<String>,
    ) -> InteropResult<PolkadotBridge> {
        let mut connections = self.connections.write().await;
        let chain = connections
            .get_mut(chain_id)
            .ok_or_else(|| InteropError::ChainNotRegistered {
                chain_id: chain_id.to_string(),
            })?;

        if !chain.chain_type_contains("polkadot") && !chain.chain_type_contains("substrate") {
            return Err(InteropError::InvalidChainType {
                chain_id: chain_id.to_string(),
                chain_type: chain.chain_type.clone(),
                expected: "Polkadot/Substrate".to_string(),
            });
        }

        let bridge = PolkadotBridge::new(
            relay_endpoint,
            relay_chain_id,
            parachain_id,
            chain.endpoint.clone(),
            api_key,
        );

        chain
            .details
            .insert("parachain_id".into(), Value::from(parachain_id));
        chain
            .details
            .insert("relay_chain_id".into(), Value::from(relay_chain_id));
        chain.details.insert(
            "relay_endpoint".into(),
            Value::from(bridge.relay_endpoint.clone()),
        );
        chain.polkadot_bridge = Some(bridge.clone());

        debug!(
            "Polkadot bridge for {} uses relay {} (parachain {})",
            chain_id, bridge.relay_endpoint, parachain_id
        );
        info!("Created Polkadot bridge for chain {}", chain_id);
        Ok(bridge)
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new()
    }
}
