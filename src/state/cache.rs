//! Short-lived memo of verification results keyed by destination tx id

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationEntry {
    pub verified: bool,
    pub verified_at: DateTime<Utc>,
    pub proof: Map<String, Value>,
}

pub struct VerificationCache {
    entries: DashMap<String, VerificationEntry>,
    ttl: Duration,
}

impl VerificationCache {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(36_500)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &VerificationEntry, now: DateTime<Utc>) -> bool {
        now - entry.verified_at < self.ttl
    }

    /// Entry for `tx_id` if it is younger than the TTL
    pub fn get_fresh(&self, tx_id: &str) -> Option<VerificationEntry> {
        let entry = self.entries.get(tx_id)?;
        if self.is_fresh(&entry, Utc::now()) {
            debug!("Verification cache hit for {}", tx_id);
            Some(entry.value().clone())
        } else {
            None
        }
    }

    pub fn upsert(&self, tx_id: &str, verified: bool, proof: Map<String, Value>) -> VerificationEntry {
        let entry = VerificationEntry {
            verified,
            verified_at: Utc::now(),
            proof,
        };
        self.entries.insert(tx_id.to_string(), entry.clone());
        entry
    }

    /// Drop stale entries and return how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| self.is_fresh(entry, now));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn insert_entry(&self, tx_id: &str, entry: VerificationEntry) {
        self.entries.insert(tx_id.to_string(), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stale_entry(cache: &VerificationCache) -> VerificationEntry {
        VerificationEntry {
            verified: true,
            verified_at: Utc::now() - cache.ttl() - Duration::seconds(1),
            proof: Map::new(),
        }
    }

    #[test]
    fn test_fresh_entry_is_returned() {
        let cache = VerificationCache::new(std::time::Duration::from_secs(300));
        assert!(cache.get_fresh("tx-1").is_none());

        cache.upsert("tx-1", true, Map::new());
        let entry = cache.get_fresh("tx-1").unwrap();
        assert!(entry.verified);
    }

    #[test]
    fn test_stale_entry_is_ignored() {
        let cache = VerificationCache::new(std::time::Duration::from_secs(300));
        cache.insert_entry("tx-old", stale_entry(&cache));

        assert!(cache.get_fresh("tx-old").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_purge_expired() {
        let cache = VerificationCache::new(std::time::Duration::from_secs(60));
        cache.insert_entry("tx-old", stale_entry(&cache));
        cache.upsert("tx-new", false, Map::new());

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_fresh("tx-new").is_some());
    }
}
