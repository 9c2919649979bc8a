//! Read-only HTTP API for health checks and engine diagnostics

use crate::chain::{ChainConnection, Protocol};
use crate::config::ApiConfig;
use crate::coordination::InteropEngine;
use crate::error::{InteropError, InteropResult};
use crate::protocol::{IbcChannelInfo, SubstrateRelayerInfo};

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<InteropEngine>,
}

/// Build the API router
pub fn router(engine: Arc<InteropEngine>) -> Router {
    let state = AppState { engine };

    Router::new()
        .route("/health", get(health_check))
        .route("/chains", get(get_chains))
        .route("/chains/:chain_id", get(get_chain))
        .route("/protocols", get(get_protocols))
        .route("/chain-types", get(get_chain_types))
        .route("/ibc/channels", get(get_ibc_channels))
        .route("/substrate/relayers", get(get_relayers))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the HTTP API server
pub async fn run_server(config: ApiConfig, engine: Arc<InteropEngine>) -> InteropResult<()> {
    let app = router(engine);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| InteropError::Internal(format!("API bind {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| InteropError::Internal(format!("API server: {}", e)))?;

    Ok(())
}

/// Error body returned by handlers
struct ApiError(InteropError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
            retryable: self.0.is_retryable(),
        });
        (self.0.status_code(), body).into_response()
    }
}

impl From<InteropError> for ApiError {
    fn from(err: InteropError) -> Self {
        Self(err)
    }
}

/// Health check endpoint - basic liveness
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        local_chain_id: state.engine.local_chain_id().to_string(),
        registered_chains: state.engine.registry().len().await,
        ibc_enabled: state.engine.ibc_channels().is_enabled(),
        substrate_enabled: state.engine.relayers().is_enabled(),
        cached_verifications: state.engine.cache().len(),
    })
}

async fn get_chains(State(state): State<AppState>) -> impl IntoResponse {
    let chains = state.engine.registry().list().await;
    Json(ChainsResponse { chains })
}

async fn get_chain(
    State(state): State<AppState>,
    Path(chain_id): Path<String>,
) -> Result<Json<Map<String, Value>>, ApiError> {
    let details = state.engine.get_chain_connection_details(&chain_id).await?;
    Ok(Json(details))
}

async fn get_protocols(State(state): State<AppState>) -> impl IntoResponse {
    Json(ProtocolsResponse {
        protocols: state.engine.supported_protocols().to_vec(),
        standards: state.engine.converters().names(),
        default_standard: state.engine.default_standard().to_string(),
    })
}

async fn get_chain_types(State(state): State<AppState>) -> impl IntoResponse {
    Json(ChainTypesResponse {
        chain_types: state.engine.supported_chain_types().to_vec(),
    })
}

async fn get_ibc_channels(State(state): State<AppState>) -> impl IntoResponse {
    Json(ChannelsResponse {
        enabled: state.engine.ibc_channels().is_enabled(),
        channels: state.engine.ibc_channels().list().await,
    })
}

async fn get_relayers(State(state): State<AppState>) -> impl IntoResponse {
    Json(RelayersResponse {
        enabled: state.engine.relayers().is_enabled(),
        relayers: state.engine.relayers().list().await,
    })
}

// Response types

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    local_chain_id: String,
    registered_chains: usize,
    ibc_enabled: bool,
    substrate_enabled: bool,
    cached_verifications: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    retryable: bool,
}

#[derive(Serialize)]
struct ChainsResponse {
    chains: Vec<ChainConnection>,
}

#[derive(Serialize)]
struct ProtocolsResponse {
    protocols: Vec<Protocol>,
    standards: Vec<String>,
    default_standard: String,
}

#[derive(Serialize)]
struct ChainTypesResponse {
    chain_types: Vec<&'static str>,
}

#[derive(Serialize)]
struct ChannelsResponse {
    enabled: bool,
    channels: Vec<IbcChannelInfo>,
}

#[derive(Serialize)]
struct RelayersResponse {
    enabled: bool,
    relayers: Vec<SubstrateRelayerInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MockLedgerClient;
    use crate::testing::RecordingTransport;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    async fn app() -> Router {
        let engine = InteropEngine::new(
            "tracepost-local",
            Arc::new(MockLedgerClient::new()),
            Arc::new(RecordingTransport::new()),
            Duration::from_secs(300),
        );
        engine
            .register_chain("eth-mainnet", "ethereum", "http://eth")
            .await
            .unwrap();
        router(Arc::new(engine))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(app().await, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["registered_chains"], 1);
        assert_eq!(body["ibc_enabled"], false);
    }

    #[tokio::test]
    async fn test_chain_details_and_listing() {
        let (status, body) = get_json(app().await, "/chains/eth-mainnet").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["protocol"], "bridge");
        assert_eq!(body["endpoint"], "http://eth");

        let (_, body) = get_json(app().await, "/chains").await;
        assert_eq!(body["chains"][0]["chain_id"], "eth-mainnet");
    }

    #[tokio::test]
    async fn test_unknown_chain_is_bad_request() {
        let (status, body) = get_json(app().await, "/chains/ghost").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("ghost"));
        assert_eq!(body["retryable"], false);
    }

    #[tokio::test]
    async fn test_static_listings() {
        let (_, body) = get_json(app().await, "/protocols").await;
        assert_eq!(body["protocols"], serde_json::json!(["ibc", "substrate", "bridge"]));
        assert_eq!(body["standards"], serde_json::json!(["GS1-EPCIS"]));

        let (_, body) = get_json(app().await, "/chain-types").await;
        assert_eq!(body["chain_types"].as_array().unwrap().len(), 6);

        let (_, body) = get_json(app().await, "/ibc/channels").await;
        assert_eq!(body["channels"], serde_json::json!([]));
    }
}
