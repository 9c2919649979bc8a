//! Cross-chain interoperability engine
//!
//! The engine:
//! 1. Registers external chains and classifies their protocol
//! 2. Converts payloads into the requested data standard
//! 3. Dispatches transactions through the matching protocol adapter
//! 4. Answers status and verification queries, memoizing verifications

use super::transaction::{source_tx_id, CrossChainTransaction, TransactionStatus};
use crate::chain::{ChainConnection, ChainRegistry, CosmosBridge, PolkadotBridge, Protocol};
use crate::config::{ChannelConfig, RelayerConfig, Settings};
use crate::error::{InteropError, InteropResult};
use crate::ledger::{LedgerClient, RelayLedgerClient, UnconfiguredLedger};
use crate::metrics;
use crate::protocol::{
    ChannelState, ChannelTable, CrossChainAdapter, DispatchRequest, GenericBridgeAdapter,
    IbcAdapter, RelayerStatus, RelayerTable, SubstrateAdapter, Verification,
};
use crate::standard::{ConverterRegistry, DataConverter, Payload};
use crate::state::VerificationCache;
use crate::transport::{HttpTransport, Transport};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Chain types the engine knows how to reach
pub const SUPPORTED_CHAIN_TYPES: [&str; 6] = [
    "cosmos",
    "polkadot",
    "substrate",
    "ethereum",
    "hyperledger",
    "corda",
];

/// Cross-chain interoperability engine
pub struct InteropEngine {
    /// Chain ID recorded as the source of every transfer
    local_chain_id: String,
    default_standard: String,
    registry: ChainRegistry,
    converters: ConverterRegistry,
    cache: VerificationCache,
    bridge: GenericBridgeAdapter,
    ibc: IbcAdapter,
    substrate: SubstrateAdapter,
}

impl InteropEngine {
    /// Create an engine with no chains and no protocols enabled
    pub fn new(
        local_chain_id: impl Into<String>,
        ledger: Arc<dyn LedgerClient>,
        transport: Arc<dyn Transport>,
        verification_ttl: Duration,
    ) -> Self {
        Self {
            local_chain_id: local_chain_id.into(),
            default_standard: crate::standard::GS1_EPCIS.to_string(),
            registry: ChainRegistry::new(),
            converters: ConverterRegistry::new(),
            cache: VerificationCache::new(verification_ttl),
            bridge: GenericBridgeAdapter::new(ledger),
            ibc: IbcAdapter::new(transport.clone()),
            substrate: SubstrateAdapter::new(transport),
        }
    }

    /// Build an engine with the HTTP transport and apply the configuration
    pub async fn from_settings(settings: &Settings) -> InteropResult<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&settings.transport)?);
        let ledger: Arc<dyn LedgerClient> = match settings.engine.relay_endpoint() {
            Some(relay) => Arc::new(RelayLedgerClient::new(relay, transport.clone())),
            None => {
                if settings
                    .enabled_chains()
                    .any(|c| Protocol::classify(&c.chain_type) == Protocol::Bridge)
                {
                    warn!("No relay endpoint configured - generic bridge sends will fail");
                }
                Arc::new(UnconfiguredLedger)
            }
        };

        Self::with_settings(settings, ledger, transport).await
    }

    /// Apply a configuration: enable protocols, register chains, then create bridges
    pub async fn with_settings(
        settings: &Settings,
        ledger: Arc<dyn LedgerClient>,
        transport: Arc<dyn Transport>,
    ) -> InteropResult<Self> {
        let mut engine = Self::new(
            settings.engine.local_chain_id.clone(),
            ledger,
            transport,
            Duration::from_secs(settings.engine.verification_ttl_secs),
        );
        engine.default_standard = settings.engine.default_standard.clone();

        if settings.ibc.enabled {
            engine.enable_ibc_protocol(&settings.ibc.channels).await?;
        }
        if settings.substrate.enabled {
            engine
                .enable_substrate_protocol(&settings.substrate.relayers)
                .await?;
        }

        for chain in settings.enabled_chains() {
            engine
                .register_chain(&chain.chain_id, &chain.chain_type, &chain.endpoint)
                .await?;

            if let Some(cosmos) = &chain.cosmos_bridge {
                engine
                    .create_cosmos_bridge(
                        &chain.chain_id,
                        &cosmos.node_endpoint,
                        cosmos.api_key.clone(),
                        &cosmos.account_address,
                    )
                    .await?;
            }
            if let Some(polkadot) = &chain.polkadot_bridge {
                engine
                    .create_polkadot_bridge(
                        &chain.chain_id,
                        &polkadot.relay_endpoint,
                        &polkadot.relay_chain_id,
                        &polkadot.parachain_id,
                        polkadot.api_key.clone(),
                    )
                    .await?;
            }
        }

        if !engine.default_standard.is_empty() && !engine.converters.contains(&engine.default_standard)
        {
            warn!(
                "Default data standard {} has no converter yet",
                engine.default_standard
            );
        }

        info!(
            "Interop engine ready for {} with {} chains",
            engine.local_chain_id,
            engine.registry.len().await
        );
        Ok(engine)
    }

    pub fn local_chain_id(&self) -> &str {
        &self.local_chain_id
    }

    pub fn default_standard(&self) -> &str {
        &self.default_standard
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    pub fn cache(&self) -> &VerificationCache {
        &self.cache
    }

    pub fn ibc_channels(&self) -> &ChannelTable {
        self.ibc.channels()
    }

    pub fn relayers(&self) -> &RelayerTable {
        self.substrate.relayers()
    }

    fn adapter(&self, protocol: Protocol) -> &dyn CrossChainAdapter {
        match protocol {
            Protocol::Bridge => &self.bridge,
            Protocol::Ibc => &self.ibc,
            Protocol::Substrate => &self.substrate,
        }
    }

    fn is_protocol_enabled(&self, protocol: Protocol) -> bool {
        match protocol {
            Protocol::Bridge => true,
            Protocol::Ibc => self.ibc.channels().is_enabled(),
            Protocol::Substrate => self.substrate.relayers().is_enabled(),
        }
    }

    // Chain registry

    /// Register an external chain and return its connection ID.
    ///
    /// Fails with `ProtocolNotEnabled` when the chain type maps to IBC or
    /// Substrate before that protocol was enabled; nothing is recorded then.
    pub async fn register_chain(
        &self,
        chain_id: &str,
        chain_type: &str,
        endpoint: &str,
    ) -> InteropResult<String> {
        if chain_id.is_empty() {
            return Err(InteropError::Config("chain ID must not be empty".to_string()));
        }

        let protocol = Protocol::classify(chain_type);
        if !self.is_protocol_enabled(protocol) {
            return Err(InteropError::ProtocolNotEnabled {
                protocol,
                chain_id: chain_id.to_string(),
            });
        }

        let connection = self
            .registry
            .register(chain_id, chain_type, endpoint, protocol)
            .await;
        self.record_chain_gauges().await;

        Ok(connection.connection_id)
    }

    async fn record_chain_gauges(&self) {
        let chains = self.registry.list().await;
        for protocol in Protocol::ALL {
            let count = chains.iter().filter(|c| c.protocol == protocol).count();
            metrics::record_registered_chains(protocol, count);
        }
    }

    pub async fn get_chain_connection_details(
        &self,
        chain_id: &str,
    ) -> InteropResult<Map<String, Value>> {
        self.registry.details(chain_id).await
    }

    pub fn supported_chain_types(&self) -> &'static [&'static str] {
        &SUPPORTED_CHAIN_TYPES
    }

    pub fn supported_protocols(&self) -> &'static [Protocol] {
        &Protocol::ALL
    }

    // Protocol setup

    /// Enable IBC with the given channel table
    pub async fn enable_ibc_protocol(&self, channels: &[ChannelConfig]) -> InteropResult<()> {
        if channels.is_empty() {
            return Err(InteropError::Config(
                "IBC needs at least one configured channel".to_string(),
            ));
        }

        self.ibc.channels().enable(channels).await;
        info!("IBC protocol enabled with {} channels", channels.len());
        Ok(())
    }

    /// Enable Substrate messaging with the given relayers
    pub async fn enable_substrate_protocol(&self, relayers: &[RelayerConfig]) -> InteropResult<()> {
        if relayers.is_empty() {
            return Err(InteropError::Config(
                "Substrate needs at least one configured relayer".to_string(),
            ));
        }

        self.substrate.relayers().enable(relayers).await;
        info!("Substrate protocol enabled with {} relayers", relayers.len());
        Ok(())
    }

    pub async fn create_cosmos_bridge(
        &self,
        chain_id: &str,
        node_endpoint: &str,
        api_key: Option<String>,
        account_address: &str,
    ) -> InteropResult<CosmosBridge> {
        self.registry
            .attach_cosmos_bridge(chain_id, node_endpoint, api_key, account_address)
            .await
    }

    pub async fn create_polkadot_bridge(
        &self,
        chain_id: &str,
        relay_endpoint: &str,
        relay_chain_id: &str,
        parachain_id: &str,
        api_key: Option<String>,
    ) -> InteropResult<PolkadotBridge> {
        self.registry
            .attach_polkadot_bridge(chain_id, relay_endpoint, relay_chain_id, parachain_id, api_key)
            .await
    }

    pub async fn set_channel_state(&self, channel_id: &str, state: ChannelState) -> InteropResult<()> {
        self.ibc.channels().set_channel_state(channel_id, state).await
    }

    pub async fn set_relayer_status(&self, relayer_id: &str, status: RelayerStatus) -> InteropResult<()> {
        self.substrate.relayers().set_relayer_status(relayer_id, status).await
    }

    pub async fn record_relayer_heartbeat(&self, relayer_id: &str) -> InteropResult<DateTime<Utc>> {
        self.substrate.relayers().record_relayer_heartbeat(relayer_id).await
    }

    // Data standards

    /// Register a converter; an existing one with the same name is replaced
    pub fn register_standard_converter(&self, name: &str, converter: DataConverter) {
        self.converters.register(name, converter);
    }

    // Transactions

    /// Convert a payload and dispatch it to `dest_chain_id`.
    ///
    /// An empty `standard` sends the payload as-is. A failed send returns no
    /// record.
    pub async fn send_cross_chain_transaction(
        &self,
        dest_chain_id: &str,
        tx_type: &str,
        payload: Payload,
        standard: &str,
    ) -> InteropResult<CrossChainTransaction> {
        let destination = self.registry.get(dest_chain_id).await?;
        let converted = self.converters.convert(standard, payload)?;
        let source_tx_id = source_tx_id(&converted);
        let adapter = self.adapter(destination.protocol);
        let protocol = adapter.protocol();

        debug!(
            "Dispatching {} to {} via {}",
            source_tx_id, dest_chain_id, protocol
        );

        let started = Instant::now();
        let result = adapter
            .send(DispatchRequest {
                source_chain_id: &self.local_chain_id,
                destination: &destination,
                tx_type,
                payload: &converted,
                source_tx_id: &source_tx_id,
            })
            .await;

        let destination_tx_id = match result {
            Ok(tx_id) => {
                metrics::record_send_success(protocol, started.elapsed().as_secs_f64());
                tx_id
            }
            Err(e) => {
                metrics::record_send_failure(protocol);
                warn!("Send to {} via {} failed: {}", dest_chain_id, protocol, e);
                return Err(e);
            }
        };

        info!(
            "Cross-chain transaction {} -> {} ({})",
            source_tx_id, destination_tx_id, dest_chain_id
        );

        Ok(CrossChainTransaction {
            source_tx_id,
            destination_tx_id,
            source_chain_id: self.local_chain_id.clone(),
            destination_chain_id: dest_chain_id.to_string(),
            protocol,
            payload: converted,
            status: TransactionStatus::Pending,
            timestamp: Utc::now(),
            retry_count: 0,
            last_error: None,
            proof_data: Map::new(),
        })
    }

    /// Send using the configured default data standard
    pub async fn send_with_default_standard(
        &self,
        dest_chain_id: &str,
        tx_type: &str,
        payload: Payload,
    ) -> InteropResult<CrossChainTransaction> {
        let standard = self.default_standard.clone();
        self.send_cross_chain_transaction(dest_chain_id, tx_type, payload, &standard)
            .await
    }

    /// Verify that `tx_id` arrived on `dest_chain_id`, consulting the cache first
    pub async fn verify_transaction(
        &self,
        tx_id: &str,
        source_chain_id: &str,
        dest_chain_id: &str,
    ) -> InteropResult<Verification> {
        let destination = self.registry.get(dest_chain_id).await?;
        self.verify_via(destination.protocol, tx_id, source_chain_id, &destination)
            .await
    }

    async fn verify_via(
        &self,
        protocol: Protocol,
        tx_id: &str,
        source_chain_id: &str,
        destination: &ChainConnection,
    ) -> InteropResult<Verification> {
        if let Some(entry) = self.cache.get_fresh(tx_id) {
            metrics::record_cache_hit();
            return Ok(Verification {
                verified: entry.verified,
                proof: entry.proof,
            });
        }
        metrics::record_cache_miss();

        let adapter = self.adapter(protocol);
        let verification = adapter.verify(tx_id, source_chain_id, destination).await?;

        self.cache
            .upsert(tx_id, verification.verified, verification.proof.clone());
        metrics::record_verification(adapter.protocol(), verification.verified);

        Ok(verification)
    }

    /// Query the status of `tx_id` on `chain_id` through `protocol`
    pub async fn get_transaction_status(
        &self,
        tx_id: &str,
        protocol: Protocol,
        chain_id: &str,
    ) -> InteropResult<TransactionStatus> {
        let chain = self.registry.get(chain_id).await?;
        let status = self.adapter(protocol).status(tx_id, &chain).await?;

        metrics::record_status_query(protocol, status);
        Ok(status)
    }

    /// Refresh a record's status from its destination chain
    pub async fn refresh_status(
        &self,
        tx: &mut CrossChainTransaction,
    ) -> InteropResult<TransactionStatus> {
        match self
            .get_transaction_status(&tx.destination_tx_id, tx.protocol, &tx.destination_chain_id)
            .await
        {
            Ok(status) => {
                tx.status = status;
                Ok(status)
            }
            Err(e) => {
                tx.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Verify a record through the protocol it was sent with and store its
    /// proof; a verified record is completed
    pub async fn verify(&self, tx: &mut CrossChainTransaction) -> InteropResult<bool> {
        let result = match self.registry.get(&tx.destination_chain_id).await {
            Ok(destination) => {
                self.verify_via(
                    tx.protocol,
                    &tx.destination_tx_id,
                    &tx.source_chain_id,
                    &destination,
                )
                .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(verification) => {
                if verification.verified {
                    tx.proof_data = verification.proof;
                    tx.status = TransactionStatus::Completed;
                }
                Ok(verification.verified)
            }
            Err(e) => {
                tx.record_failure(&e);
                Err(e)
            }
        }
    }
}
