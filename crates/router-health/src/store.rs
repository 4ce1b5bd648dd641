use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;

use crate::record::ProviderHealthRecord;

/// Store-layer failures for health record reads/writes
#[derive(Debug, Error)]
pub enum HealthStoreError {
    #[error("health store backend: {0}")]
    Backend(String),
    #[error("health record serialization: {0}")]
    Serialization(String),
}

/// Persists `ProviderHealthRecord`s keyed by `"<provider>#<region>"`
///
/// Implementations must give strong read-your-writes consistency for a
/// single key; writes are last-writer-wins across concurrent readers
/// (spec.md §4.3) — no optimistic locking, duplicate HALF_OPEN probes are an
/// accepted cost for simplicity.
#[async_trait::async_trait]
pub trait ProviderHealthStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<ProviderHealthRecord>, HealthStoreError>;

    async fn put(&self, record: &ProviderHealthRecord, ttl: Duration) -> Result<(), HealthStoreError>;
}

/// In-process health store backed by a `DashMap`
///
/// Used for the gateway's single-node test mode and for routing unit tests;
/// does not honor TTL expiry since entries live only as long as the process.
#[derive(Debug, Default)]
pub struct InMemoryHealthStore {
    records: DashMap<String, ProviderHealthRecord>,
}

impl InMemoryHealthStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ProviderHealthStore for InMemoryHealthStore {
    async fn get(&self, key: &str) -> Result<Option<ProviderHealthRecord>, HealthStoreError> {
        Ok(self.records.get(key).map(|r| r.clone()))
    }

    async fn put(&self, record: &ProviderHealthRecord, _ttl: Duration) -> Result<(), HealthStoreError> {
        self.records.insert(record.key.clone(), record.clone());
        Ok(())
    }
}

/// Redis-backed health store: JSON blob per key with `SET ... EX <ttl>`
///
/// Mirrors `synapse-cache`'s response cache pattern, applied to circuit
/// breaker state instead of completion responses.
#[derive(Clone)]
pub struct RedisHealthStore {
    client: redis::Client,
    key_prefix: Arc<str>,
}

impl RedisHealthStore {
    /// # Errors
    ///
    /// Returns an error if `url` is not a valid Redis connection string.
    pub fn new(url: &str, key_prefix: impl Into<Arc<str>>) -> Result<Self, HealthStoreError> {
        let client = redis::Client::open(url).map_err(|e| HealthStoreError::Backend(format!("invalid URL: {e}")))?;
        Ok(Self {
            client,
            key_prefix: key_prefix.into(),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:health:{key}", self.key_prefix)
    }
}

#[async_trait::async_trait]
impl ProviderHealthStore for RedisHealthStore {
    async fn get(&self, key: &str) -> Result<Option<ProviderHealthRecord>, HealthStoreError> {
        use redis::AsyncCommands;

        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| HealthStoreError::Backend(format!("connection failed: {e}")))?;

        let data: Option<String> = conn
            .get(self.namespaced(key))
            .await
            .map_err(|e| HealthStoreError::Backend(format!("GET failed: {e}")))?;

        data.map(|raw| {
            serde_json::from_str(&raw).map_err(|e| HealthStoreError::Serialization(format!("deserialize: {e}")))
        })
        .transpose()
    }

    async fn put(&self, record: &ProviderHealthRecord, ttl: Duration) -> Result<(), HealthStoreError> {
        use redis::AsyncCommands;

        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| HealthStoreError::Backend(format!("connection failed: {e}")))?;

        let data = serde_json::to_string(record)
            .map_err(|e| HealthStoreError::Serialization(format!("serialize: {e}")))?;

        let _: () = conn
            .set_ex(self.namespaced(&record.key), &data, ttl.as_secs())
            .await
            .map_err(|e| HealthStoreError::Backend(format!("SET failed: {e}")))?;

        Ok(())
    }
}

/// Forwards to the boxed trait object, letting the gateway pick a backend
/// (in-memory vs Redis) at startup while `CircuitBreakerManager<S>` stays a
/// single concrete type regardless of which one was chosen.
#[async_trait::async_trait]
impl ProviderHealthStore for Arc<dyn ProviderHealthStore> {
    async fn get(&self, key: &str) -> Result<Option<ProviderHealthRecord>, HealthStoreError> {
        (**self).get(key).await
    }

    async fn put(&self, record: &ProviderHealthRecord, ttl: Duration) -> Result<(), HealthStoreError> {
        (**self).put(record, ttl).await
    }
}
