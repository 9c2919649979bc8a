//! Coordination of cross-chain transactions
//!
//! The engine resolves the destination chain, converts the payload, hands it
//! to the protocol adapter and returns an owned transaction record.

pub mod engine;
pub mod transaction;

pub use engine::{InteropEngine, SUPPORTED_CHAIN_TYPES};
pub use transaction::{source_tx_id, CrossChainTransaction, TransactionStatus};
