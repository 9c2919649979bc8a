//! Configuration management for the interoperability engine
//!
//! Loads configuration from TOML files with environment variable substitution.

use crate::protocol::ibc::ChannelState;
use crate::protocol::substrate::RelayerStatus;

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable holding the config file path
pub const CONFIG_ENV_VAR: &str = "INTEROP_CONFIG";

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub ibc: IbcConfig,
    #[serde(default)]
    pub substrate: SubstrateConfig,
    #[serde(default)]
    pub chains: Vec<ChainConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Chain ID of the local ledger, used as the source of every transfer
    pub local_chain_id: String,
    /// Relay used by the generic bridge ledger client
    pub relay_endpoint: Option<String>,
    /// Standard applied by callers that do not name one
    pub default_standard: String,
    pub verification_ttl_secs: u64,
}

impl EngineConfig {
    /// Relay endpoint, treating an empty substitution as unset
    pub fn relay_endpoint(&self) -> Option<&str> {
        self.relay_endpoint.as_deref().filter(|e| !e.is_empty())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            local_chain_id: "local-ledger".to_string(),
            relay_endpoint: None,
            default_standard: crate::standard::GS1_EPCIS.to_string(),
            verification_ttl_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8088,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9188,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of the human-readable format
    pub json: bool,
    /// Overrides the default filter when `RUST_LOG` is unset
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IbcConfig {
    pub enabled: bool,
    pub channels: Vec<ChannelConfig>,
}

/// One IBC channel towards a Cosmos counterparty
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    pub channel_id: String,
    pub port_id: String,
    pub counterparty_channel_id: String,
    pub counterparty_port_id: String,
    #[serde(default)]
    pub connection_hops: Vec<String>,
    #[serde(default = "default_channel_state")]
    pub state: ChannelState,
    #[serde(default = "default_channel_version")]
    pub version: String,
}

fn default_channel_state() -> ChannelState {
    ChannelState::Open
}

fn default_channel_version() -> String {
    "ics20-1".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubstrateConfig {
    pub enabled: bool,
    pub relayers: Vec<RelayerConfig>,
}

/// One XCM relayer
#[derive(Debug, Clone, Deserialize)]
pub struct RelayerConfig {
    pub relayer_id: String,
    pub network_address: String,
    #[serde(default)]
    pub public_key: String,
    pub supported_chains: Vec<String>,
    #[serde(default = "default_relayer_status")]
    pub status: RelayerStatus,
}

fn default_relayer_status() -> RelayerStatus {
    RelayerStatus::Active
}

/// External chain registered at startup
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: String,
    pub chain_type: String,
    pub endpoint: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub cosmos_bridge: Option<CosmosBridgeConfig>,
    pub polkadot_bridge: Option<PolkadotBridgeConfig>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct CosmosBridgeConfig {
    pub node_endpoint: String,
    pub api_key: Option<String>,
    #[serde(default)]
    pub account_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolkadotBridgeConfig {
    pub relay_endpoint: String,
    pub relay_chain_id: String,
    pub parachain_id: String,
    pub api_key: Option<String>,
}

impl Settings {
    /// Load settings from the file named by `INTEROP_CONFIG`
    pub fn load() -> Result<Self> {
        let config_path = env::var(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::from_toml_str(&config_str)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.engine.local_chain_id.is_empty() {
            anyhow::bail!("engine.local_chain_id must not be empty");
        }

        let mut seen = HashSet::new();
        for chain in &self.chains {
            if chain.chain_id.is_empty() {
                anyhow::bail!("Chain entries need a chain_id");
            }
            if !seen.insert(chain.chain_id.as_str()) {
                anyhow::bail!("Chain {} is configured twice", chain.chain_id);
            }
            if chain.enabled && chain.endpoint.is_empty() {
                anyhow::bail!("Chain {} has no endpoint configured", chain.chain_id);
            }
        }

        for channel in &self.ibc.channels {
            if channel.channel_id.is_empty() || channel.port_id.is_empty() {
                anyhow::bail!("IBC channels need both channel_id and port_id");
            }
        }

        for relayer in &self.substrate.relayers {
            if relayer.relayer_id.is_empty() {
                anyhow::bail!("Substrate relayers need a relayer_id");
            }
            if relayer.supported_chains.is_empty() {
                anyhow::bail!("Relayer {} lists no supported chains", relayer.relayer_id);
            }
        }

        Ok(())
    }

    /// Chains to register at startup
    pub fn enabled_chains(&self) -> impl Iterator<Item = &ChainConfig> {
        self.chains.iter().filter(|c| c.enabled)
    }

    /// Get chain config by chain ID
    pub fn get_chain(&self, chain_id: &str) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }
}

lazy_static! {
    static ref ENV_VAR_PATTERN: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();

    for cap in ENV_VAR_PATTERN.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
