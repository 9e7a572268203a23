//! Secrets bridge: provider chain, TTL cache, and access auditing.
//!
//! Per §4.3: "Exposes `get(key, default?)` and an async variant. ...
//! Successful fetches are cached with TTL (default 5 minutes). Every access
//! increments an in-memory audit counter. Missing secrets without a default
//! fail the call with `ConfigurationError` (non-retryable)."

use agentkern_common::{ControlPlaneError, Result};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::provider::{EnvProvider, SecretProvider};

const DEFAULT_TTL_SECS: i64 = 300;

struct CacheEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Per-key access counters, kept for audit/ops visibility.
#[derive(Debug, Default, Clone, Copy)]
pub struct AccessAudit {
    pub hits: u64,
    pub misses: u64,
    pub provider_fetches: u64,
}

pub struct SecretsBridge {
    providers: Vec<Arc<dyn SecretProvider>>,
    ttl: Duration,
    cache: RwLock<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    provider_fetches: AtomicU64,
}

impl Default for SecretsBridge {
    fn default() -> Self {
        Self::new(vec![Arc::new(EnvProvider)], Duration::seconds(DEFAULT_TTL_SECS))
    }
}

impl SecretsBridge {
    pub fn new(providers: Vec<Arc<dyn SecretProvider>>, ttl: Duration) -> Self {
        Self {
            providers,
            ttl,
            cache: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            provider_fetches: AtomicU64::new(0),
        }
    }

    pub fn audit(&self) -> AccessAudit {
        AccessAudit {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            provider_fetches: self.provider_fetches.load(Ordering::Relaxed),
        }
    }

    /// Resolve `key` via cache, then provider chain in order, then `default`.
    /// Fails with `ControlPlaneError::Configuration` if none resolve it.
    pub async fn get(&self, key: &str, default: Option<&str>) -> Result<String> {
        let now = Utc::now();
        if let Some(cached) = self.cache_lookup(key, now) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        for provider in &self.providers {
            self.provider_fetches.fetch_add(1, Ordering::Relaxed);
            if let Some(value) = provider.fetch(key).await {
                tracing::debug!(secret_key = key, provider = provider.name(), "secret resolved");
                self.cache_store(key, &value, now);
                return Ok(value);
            }
        }

        if let Some(default_value) = default {
            return Ok(default_value.to_string());
        }

        Err(ControlPlaneError::Configuration(format!("secret not found: {key}")))
    }

    fn cache_lookup(&self, key: &str, now: DateTime<Utc>) -> Option<String> {
        let cache = self.cache.read();
        cache.get(key).filter(|entry| entry.expires_at > now).map(|entry| entry.value.clone())
    }

    fn cache_store(&self, key: &str, value: &str, now: DateTime<Utc>) {
        let mut cache = self.cache.write();
        cache.insert(
            key.to_string(),
            CacheEntry { value: value.to_string(), expires_at: now + self.ttl },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;

    #[tokio::test]
    async fn resolves_from_provider_and_caches() {
        let mut values = StdHashMap::new();
        values.insert("DB_PASSWORD".to_string(), "s3cr3t".to_string());
        let provider = Arc::new(crate::provider::StaticProvider::new("test", values));
        let bridge = SecretsBridge::new(vec![provider], Duration::seconds(60));

        let first = bridge.get("DB_PASSWORD", None).await.unwrap();
        assert_eq!(first, "s3cr3t");
        let second = bridge.get("DB_PASSWORD", None).await.unwrap();
        assert_eq!(second, "s3cr3t");

        let audit = bridge.audit();
        assert_eq!(audit.hits, 1);
        assert_eq!(audit.misses, 1);
    }

    #[tokio::test]
    async fn missing_without_default_is_configuration_error() {
        let bridge = SecretsBridge::new(vec![], Duration::seconds(60));
        let err = bridge.get("NOPE", None).await.unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(err.code(), "configuration");
    }

    #[tokio::test]
    async fn missing_with_default_falls_back() {
        let bridge = SecretsBridge::new(vec![], Duration::seconds(60));
        let value = bridge.get("NOPE", Some("fallback")).await.unwrap();
        assert_eq!(value, "fallback");
    }
}
