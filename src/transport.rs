//! JSON-over-HTTP transport to bridge and relay endpoints

use crate::config::TransportConfig;
use crate::error::{InteropError, InteropResult};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Header carrying bridge API keys
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Failure talking to a remote endpoint
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("{url} answered HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Outbound JSON transport used by protocol adapters
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a JSON body and decode the JSON answer
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        api_key: Option<&str>,
    ) -> Result<Value, TransportError>;

    /// GET a JSON document
    async fn get_json(&self, url: &str, api_key: Option<&str>) -> Result<Value, TransportError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the configured timeouts
    pub fn new(config: &TransportConfig) -> InteropResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .map_err(|e| InteropError::Config(format!("Invalid HTTP client settings: {}", e)))?;

        Ok(Self { client })
    }

    async fn execute(&self, url: &str, request: RequestBuilder) -> Result<Value, TransportError> {
        let response = request.send().await.map_err(|e| {
            warn!("Request to {} failed: {}", url, e);
            TransportError::Request {
                url: url.to_string(),
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| TransportError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        if !is_success(status) {
            warn!("{} answered HTTP {}", url, status.as_u16());
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        debug!("{} answered HTTP {} ({} bytes)", url, status.as_u16(), body.len());
        decode_body(url, &body)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        api_key: Option<&str>,
    ) -> Result<Value, TransportError> {
        let mut request = self.client.post(url).json(body);
        if let Some(key) = api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        self.execute(url, request).await
    }

    async fn get_json(&self, url: &str, api_key: Option<&str>) -> Result<Value, TransportError> {
        let mut request = self.client.get(url);
        if let Some(key) = api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        self.execute(url, request).await
    }
}

fn is_success(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED
    )
}

/// Empty bodies decode to an empty object so callers can fall back on missing fields
fn decode_body(url: &str, body: &str) -> Result<Value, TransportError> {
    if body.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(body).map_err(|e| TransportError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}
