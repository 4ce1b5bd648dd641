use dashmap::DashMap;
use router_core::{Profile, ProfileId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileStoreError {
    #[error("profile store backend: {0}")]
    Backend(String),
    #[error("profile record serialization: {0}")]
    Serialization(String),
}

/// Reads Profile rows, keyed by `profileId` as `"PROFILE#<region>#<logicalId>"`
/// (spec.md §6 "Profiles table").
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, profile_id: &ProfileId) -> Result<Option<Profile>, ProfileStoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    rows: DashMap<String, Profile>,
}

impl InMemoryProfileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, profile: Profile) {
        self.rows.insert(profile.profile_id.as_str().to_owned(), profile);
    }
}

#[async_trait::async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, profile_id: &ProfileId) -> Result<Option<Profile>, ProfileStoreError> {
        Ok(self.rows.get(profile_id.as_str()).map(|r| r.clone()))
    }
}

/// Redis-backed profile store: JSON blob per key
#[derive(Clone)]
pub struct RedisProfileStore {
    client: redis::Client,
}

impl RedisProfileStore {
    /// # Errors
    ///
    /// Returns an error if `url` is not a valid Redis connection string.
    pub fn new(url: &str) -> Result<Self, ProfileStoreError> {
        let client = redis::Client::open(url).map_err(|e| ProfileStoreError::Backend(format!("invalid URL: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl ProfileStore for RedisProfileStore {
    async fn get(&self, profile_id: &ProfileId) -> Result<Option<Profile>, ProfileStoreError> {
        use redis::AsyncCommands;

        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| ProfileStoreError::Backend(format!("connection failed: {e}")))?;

        let data: Option<String> = conn
            .get(profile_id.as_str())
            .await
            .map_err(|e| ProfileStoreError::Backend(format!("GET failed: {e}")))?;

        data.map(|raw| {
            serde_json::from_str(&raw).map_err(|e| ProfileStoreError::Serialization(format!("deserialize: {e}")))
        })
        .transpose()
    }
}
