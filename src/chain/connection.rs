//! Chain connection records and protocol classification

use super::bridge::{CosmosBridge, PolkadotBridge};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Cross-chain transport protocol assigned to a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Generic bridge through the base ledger client
    Bridge,
    /// Inter-Blockchain Communication (Cosmos)
    Ibc,
    /// XCM through Substrate relayers (Polkadot)
    Substrate,
}

impl Protocol {
    /// Every protocol the engine can dispatch over
    pub const ALL: [Protocol; 3] = [Protocol::Ibc, Protocol::Substrate, Protocol::Bridge];

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Bridge => "bridge",
            Protocol::Ibc => "ibc",
            Protocol::Substrate => "substrate",
        }
    }

    /// Classify a free-form chain type.
    ///
    /// This is a substring heuristic rather than a catalog lookup: anything
    /// mentioning "cosmos" speaks IBC, anything mentioning "polkadot" or
    /// "substrate" goes through XCM relayers, and everything else falls back
    /// to the generic bridge. Extend it only together with the table test below.
    pub fn classify(chain_type: &str) -> Self {
        let chain_type = chain_type.to_lowercase();
        if chain_type.contains("cosmos") {
            Protocol::Ibc
        } else if chain_type.contains("polkadot") || chain_type.contains("substrate") {
            Protocol::Substrate
        } else {
            Protocol::Bridge
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection status of an external chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainStatus {
    Active,
    Inactive,
    Syncing,
}

impl ChainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainStatus::Active => "active",
            ChainStatus::Inactive => "inactive",
            ChainStatus::Syncing => "syncing",
        }
    }
}

/// A registered external chain
#[derive(Debug, Clone, Serialize)]
pub struct ChainConnection {
    pub chain_id: String,
    pub chain_type: String,
    pub endpoint: String,
    pub connection_id: String,
    /// Fixed at registration
    pub protocol: Protocol,
    pub status: ChainStatus,
    pub last_sync: DateTime<Utc>,
    /// Protocol-specific details (channel ids, parachain ids, ...)
    pub details: Map<String, Value>,
    pub cosmos_bridge: Option<CosmosBridge>,
    pub polkadot_bridge: Option<PolkadotBridge>,
}

impl ChainConnection {
    /// Flat view of the connection used by status endpoints
    pub fn detail_map(&self) -> Map<String, Value> {
        let mut details = Map::new();
        details.insert("chain_id".into(), Value::from(self.chain_id.clone()));
        details.insert("chain_type".into(), Value::from(self.chain_type.clone()));
        details.insert("endpoint".into(), Value::from(self.endpoint.clone()));
        details.insert(
            "connection_id".into(),
            Value::from(self.connection_id.clone()),
        );
        details.insert("status".into(), Value::from(self.status.as_str()));
        details.insert("protocol".into(), Value::from(self.protocol.as_str()));
        details.insert(
            "last_sync".into(),
            Value::from(self.last_sync.to_rfc3339()),
        );

        for (key, value) in &self.details {
            details.insert(key.clone(), value.clone());
        }

        details
    }

    pub fn chain_type_contains(&self, needle: &str) -> bool {
        self.chain_type.to_lowercase().contains(needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_chain_types() {
        let cases = [
            ("cosmos", Protocol::Ibc),
            ("Cosmos-SDK", Protocol::Ibc),
            ("osmosis-cosmos-zone", Protocol::Ibc),
            ("polkadot", Protocol::Substrate),
            ("POLKADOT-parachain", Protocol::Substrate),
            ("substrate", Protocol::Substrate),
            ("kusama-Substrate", Protocol::Substrate),
            ("ethereum", Protocol::Bridge),
            ("hyperledger", Protocol::Bridge),
            ("corda", Protocol::Bridge),
            ("", Protocol::Bridge),
        ];

        for (chain_type, expected) in cases {
            assert_eq!(
                Protocol::classify(chain_type),
                expected,
                "chain type {:?}",
                chain_type
            );
        }
    }

    #[test]
    fn test_cosmos_wins_over_substrate() {
        // "cosmos" is checked first
        assert_eq!(Protocol::classify("cosmos-substrate-hybrid"), Protocol::Ibc);
    }

    #[test]
    fn test_protocol_serde_names() {
        assert_eq!(serde_json::to_string(&Protocol::Ibc).unwrap(), "\"ibc\"");
        let parsed: Protocol = serde_json::from_str("\"substrate\"").unwrap();
        assert_eq!(parsed, Protocol::Substrate);
        assert_eq!(Protocol::Bridge.to_string(), "bridge");
    }
}
