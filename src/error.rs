//! Error types for the interoperability engine

use crate::chain::Protocol;

use axum::http::StatusCode;
use thiserror::Error;

/// Main error type for the engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InteropError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chain {chain_id} not registered")]
    ChainNotRegistered { chain_id: String },

    #[error("{protocol} protocol is not enabled - enable it before registering {chain_id}")]
    ProtocolNotEnabled { protocol: Protocol, chain_id: String },

    #[error("Data standard converter for {name} not found")]
    UnknownDataStandard { name: String },

    #[error("Data conversion to {standard} failed: {message}")]
    ConversionFailed { standard: String, message: String },

    #[error("No open IBC channel available")]
    NoOpenChannel,

    #[error("No active relayer available for chain {chain_id}")]
    NoActiveRelayer { chain_id: String },

    #[error("No bridge configured for chain {chain_id}")]
    NoBridgeConfigured { chain_id: String },

    #[error("Dispatch via {protocol} failed: {message}")]
    DispatchFailed { protocol: Protocol, message: String },

    #[error("Chain {chain_id} has type {chain_type}, expected a {expected} chain")]
    InvalidChainType {
        chain_id: String,
        chain_type: String,
        expected: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl InteropError {
    /// Check if a caller-driven retry may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InteropError::DispatchFailed { .. }
                | InteropError::NoOpenChannel
                | InteropError::NoActiveRelayer { .. }
        )
    }

    /// Errors caused by the request itself rather than a remote endpoint
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            InteropError::ChainNotRegistered { .. }
                | InteropError::ProtocolNotEnabled { .. }
                | InteropError::UnknownDataStandard { .. }
                | InteropError::ConversionFailed { .. }
                | InteropError::InvalidChainType { .. }
                | InteropError::NoBridgeConfigured { .. }
        )
    }

    /// HTTP status a handler layer should answer with
    pub fn status_code(&self) -> StatusCode {
        if self.is_client_error() {
            return StatusCode::BAD_REQUEST;
        }
        match self {
            InteropError::DispatchFailed { .. }
            | InteropError::NoOpenChannel
            | InteropError::NoActiveRelayer { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result type for engine operations
pub type InteropResult<T> = Result<T, InteropError>;
