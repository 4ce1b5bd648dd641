use dashmap::DashMap;
use router_core::{Family, FamilyId};
use thiserror::Error;

/// Store-layer failures reading/writing family rows
#[derive(Debug, Error)]
pub enum FamilyStoreError {
    #[error("family store backend: {0}")]
    Backend(String),
    #[error("family record serialization: {0}")]
    Serialization(String),
}

/// Reads (and, for best-effort debits, writes) Family rows, keyed by
/// `familyId` as `"FAMILY#<region>#<logicalId>"` (spec.md §6 "Families
/// table").
#[async_trait::async_trait]
pub trait FamilyStore: Send + Sync {
    async fn get(&self, family_id: &FamilyId) -> Result<Option<Family>, FamilyStoreError>;

    /// Debit `amount` tokens from the family's balance
    ///
    /// Best-effort per spec.md §4.4 step 4c: called by the Router after a
    /// successful completion, not part of the admission read path.
    async fn debit(&self, family_id: &FamilyId, amount: i64) -> Result<(), FamilyStoreError>;
}

/// In-process family store backed by a `DashMap`, for tests and the
/// gateway's single-node fallback mode.
#[derive(Debug, Default)]
pub struct InMemoryFamilyStore {
    rows: DashMap<String, Family>,
}

impl InMemoryFamilyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, family: Family) {
        self.rows.insert(family.family_id.as_str().to_owned(), family);
    }
}

#[async_trait::async_trait]
impl FamilyStore for InMemoryFamilyStore {
    async fn get(&self, family_id: &FamilyId) -> Result<Option<Family>, FamilyStoreError> {
        Ok(self.rows.get(family_id.as_str()).map(|r| r.clone()))
    }

    async fn debit(&self, family_id: &FamilyId, amount: i64) -> Result<(), FamilyStoreError> {
        if let Some(mut row) = self.rows.get_mut(family_id.as_str()) {
            row.token_balance -= amount;
        }
        Ok(())
    }
}

/// Redis-backed family store: JSON blob per key, no TTL (rows are durable
/// account state, not ephemeral health records).
#[derive(Clone)]
pub struct RedisFamilyStore {
    client: redis::Client,
}

impl RedisFamilyStore {
    /// # Errors
    ///
    /// Returns an error if `url` is not a valid Redis connection string.
    pub fn new(url: &str) -> Result<Self, FamilyStoreError> {
        let client = redis::Client::open(url).map_err(|e| FamilyStoreError::Backend(format!("invalid URL: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl FamilyStore for RedisFamilyStore {
    async fn get(&self, family_id: &FamilyId) -> Result<Option<Family>, FamilyStoreError> {
        use redis::AsyncCommands;

        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| FamilyStoreError::Backend(format!("connection failed: {e}")))?;

        let data: Option<String> = conn
            .get(family_id.as_str())
            .await
            .map_err(|e| FamilyStoreError::Backend(format!("GET failed: {e}")))?;

        data.map(|raw| {
            serde_json::from_str(&raw).map_err(|e| FamilyStoreError::Serialization(format!("deserialize: {e}")))
        })
        .transpose()
    }

    async fn debit(&self, family_id: &FamilyId, amount: i64) -> Result<(), FamilyStoreError> {
        use redis::AsyncCommands;

        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| FamilyStoreError::Backend(format!("connection failed: {e}")))?;

        let Some(raw): Option<String> = conn
            .get(family_id.as_str())
            .await
            .map_err(|e| FamilyStoreError::Backend(format!("GET failed: {e}")))?
        else {
            tracing::warn!(family_id = %family_id, "debit against unknown family, skipped");
            return Ok(());
        };

        let mut family: Family =
            serde_json::from_str(&raw).map_err(|e| FamilyStoreError::Serialization(format!("deserialize: {e}")))?;
        family.token_balance -= amount;

        let data = serde_json::to_string(&family)
            .map_err(|e| FamilyStoreError::Serialization(format!("serialize: {e}")))?;

        let _: () = conn
            .set(family_id.as_str(), &data)
            .await
            .map_err(|e| FamilyStoreError::Backend(format!("SET failed: {e}")))?;

        Ok(())
    }
}
