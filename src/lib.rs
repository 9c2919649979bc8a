//! Cross-chain interoperability engine
//!
//! Registers external chains, classifies each into a transport protocol
//! (generic bridge, IBC or Substrate/XCM), converts payloads into data
//! standards such as GS1 EPCIS, dispatches them across chains and tracks
//! and verifies the resulting transactions.

pub mod api;
pub mod chain;
pub mod config;
pub mod coordination;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod protocol;
pub mod standard;
pub mod state;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use chain::{ChainConnection, ChainRegistry, ChainStatus, Protocol};
pub use config::Settings;
pub use coordination::{CrossChainTransaction, InteropEngine, TransactionStatus};
pub use error::{InteropError, InteropResult};
pub use ledger::LedgerClient;
pub use standard::{DataConverter, Payload};
pub use transport::Transport;
