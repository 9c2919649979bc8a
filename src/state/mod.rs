//! In-memory engine state
//!
//! Holds the verification cache. Chain, channel and relayer tables live with
//! the registry and the adapters that own them.

mod cache;

pub use cache::{VerificationCache, VerificationEntry};
