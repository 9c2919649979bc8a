//! Test doubles shared by the unit tests

use crate::chain::{ChainConnection, ChainStatus, Protocol};
use crate::transport::{Transport, TransportError};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub body: Value,
    pub api_key: Option<String>,
}

/// Transport answering scripted responses per URL and recording every call.
///
/// Unscripted URLs answer HTTP 404.
#[derive(Default)]
pub struct RecordingTransport {
    post_responses: Mutex<HashMap<String, Result<Value, TransportError>>>,
    get_responses: Mutex<HashMap<String, Result<Value, TransportError>>>,
    posts: Mutex<Vec<RecordedCall>>,
    gets: Mutex<Vec<RecordedCall>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_post(&self, url: &str, response: Result<Value, TransportError>) {
        self.post_responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn respond_get(&self, url: &str, response: Result<Value, TransportError>) {
        self.get_responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn posts(&self) -> Vec<RecordedCall> {
        self.posts.lock().unwrap().clone()
    }

    pub fn gets(&self) -> Vec<RecordedCall> {
        self.gets.lock().unwrap().clone()
    }

    pub fn post_count(&self, url: &str) -> usize {
        self.posts.lock().unwrap().iter().filter(|c| c.url == url).count()
    }

    fn answer(
        responses: &Mutex<HashMap<String, Result<Value, TransportError>>>,
        url: &str,
    ) -> Result<Value, TransportError> {
        responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| {
                Err(TransportError::Status {
                    url: url.to_string(),
                    status: 404,
                    body: "not scripted".to_string(),
                })
            })
    }
}

/// Shorthand for a failing response
pub fn unavailable(url: &str) -> Result<Value, TransportError> {
    Err(TransportError::Status {
        url: url.to_string(),
        status: 503,
        body: "unavailable".to_string(),
    })
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        api_key: Option<&str>,
    ) -> Result<Value, TransportError> {
        self.posts.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            body: body.clone(),
            api_key: api_key.map(str::to_string),
        });
        Self::answer(&self.post_responses, url)
    }

    async fn get_json(&self, url: &str, api_key: Option<&str>) -> Result<Value, TransportError> {
        self.gets.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            body: Value::Null,
            api_key: api_key.map(str::to_string),
        });
        Self::answer(&self.get_responses, url)
    }
}

/// Bare chain connection for adapter tests
pub fn connection(chain_id: &str, chain_type: &str, protocol: Protocol) -> ChainConnection {
    ChainConnection {
        chain_id: chain_id.to_string(),
        chain_type: chain_type.to_string(),
        endpoint: format!("http://{}", chain_id),
        connection_id: format!("{}-test", chain_id),
        protocol,
        status: ChainStatus::Active,
        last_sync: Utc::now(),
        details: Map::new(),
        cosmos_bridge: None,
        polkadot_bridge: None,
    }
}
