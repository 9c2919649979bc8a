//! Protocol bridge handles attached to chain connections

use serde::Serialize;

/// Handle to a Cosmos node used for IBC verification and status queries
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CosmosBridge {
    pub node_endpoint: String,
    pub chain_id: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub account_address: String,
}

impl CosmosBridge {
    pub fn new(
        node_endpoint: impl Into<String>,
        chain_id: impl Into<String>,
        api_key: Option<String>,
        account_address: impl Into<String>,
    ) -> Self {
        Self {
            node_endpoint: trim_endpoint(node_endpoint.into()),
            chain_id: chain_id.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
            account_address: account_address.into(),
        }
    }
}

/// Handle to a Polkadot relay chain and parachain used for XCM dispatch
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PolkadotBridge {
    pub relay_endpoint: String,
    pub relay_chain_id: String,
    pub parachain_id: String,
    pub parachain_endpoint: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl PolkadotBridge {
    pub fn new(
        relay_endpoint: impl Into<String>,
        relay_chain_id: impl Into<String>,
        parachain_id: impl Into<String>,
        parachain_endpoint: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            relay_endpoint: trim_endpoint(relay_endpoint.into()),
            relay_chain_id: relay_chain_id.into(),
            parachain_id: parachain_id.into(),
            parachain_endpoint: trim_endpoint(parachain_endpoint.into()),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }
}

/// Strip trailing slashes so paths can be appended with `format!`
pub(crate) fn trim_endpoint(endpoint: String) -> String {
    endpoint.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_are_trimmed() {
        let bridge = CosmosBridge::new("http://node:1317/", "cosmos-hub", None, "cosmos1abc");
        assert_eq!(bridge.node_endpoint, "http://node:1317");

        let bridge = PolkadotBridge::new(
            "http://relay//",
            "polkadot",
            "2000",
            "http://para:9933",
            Some(String::new()),
        );
        assert_eq!(bridge.relay_endpoint, "http://relay");
        assert!(bridge.api_key.is_none());
    }

    #[test]
    fn test_api_key_not_serialized() {
        let bridge = CosmosBridge::new(
            "http://node",
            "cosmos-hub",
            Some("secret".to_string()),
            "cosmos1abc",
        );
        let json = serde_json::to_string(&bridge).unwrap();
        assert!(!json.contains("secret"));
    }
}
