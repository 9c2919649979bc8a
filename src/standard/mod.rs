//! Data standard converters
//!
//! A converter is a pure payload transform selected by name at send time.
//! The GS1 EPCIS converter is built in; other standards are registered by
//! the embedding application.

pub mod epcis;

use crate::error::{InteropError, InteropResult};

use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// JSON map carried through conversion and dispatch
pub type Payload = Map<String, Value>;

/// Named payload transform
pub type DataConverter = Arc<dyn Fn(&Payload) -> InteropResult<Payload> + Send + Sync>;

/// Name of the built-in GS1 EPCIS converter
pub const GS1_EPCIS: &str = "GS1-EPCIS";

/// Converters indexed by standard name
pub struct ConverterRegistry {
    converters: DashMap<String, DataConverter>,
}

impl ConverterRegistry {
    /// Registry without any converters
    pub fn empty() -> Self {
        Self {
            converters: DashMap::new(),
        }
    }

    /// Registry with the built-in converters
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.register(GS1_EPCIS, Arc::new(epcis::to_epcis_event));
        registry
    }

    /// Register a converter, replacing any previous one with the same name
    pub fn register(&self, name: &str, converter: DataConverter) {
        if self.converters.insert(name.to_string(), converter).is_some() {
            debug!("Replaced data standard converter {}", name);
        } else {
            info!("Registered data standard converter {}", name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.converters.contains_key(name)
    }

    /// Registered standard names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.converters.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Convert a payload to the named standard.
    ///
    /// An empty name passes the payload through untouched.
    pub fn convert(&self, name: &str, payload: Payload) -> InteropResult<Payload> {
        if name.is_empty() {
            return Ok(payload);
        }

        // Clone the handle out so the shard lock is released before converting
        let converter = self
            .converters
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| InteropError::UnknownDataStandard {
                name: name.to_string(),
            })?;

        converter(&payload).map_err(|e| match e {
            InteropError::ConversionFailed { .. } => e,
            other => InteropError::ConversionFailed {
                standard: name.to_string(),
                message: other.to_string(),
            },
        })
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
