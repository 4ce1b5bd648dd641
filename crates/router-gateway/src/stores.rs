use std::sync::Arc;
use std::time::Duration;

use router_auth::{FamilyStore, InMemoryFamilyStore, InMemoryProfileStore, ProfileStore, RedisFamilyStore, RedisProfileStore};
use router_health::{InMemoryHealthStore, ProviderHealthStore, RedisHealthStore};
use router_routing::{InMemoryLedger, RedisLedger, TokenLedger};

/// Health/family/profile/ledger store handles, selected once at startup from
/// `ServerConfig.store_url` (spec.md §6): Redis-backed when a URL is
/// configured, in-memory for a single-node or test deployment.
pub struct Stores {
    pub health: Arc<dyn ProviderHealthStore>,
    pub families: Arc<dyn FamilyStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub ledger: Arc<dyn TokenLedger>,
}

impl Stores {
    /// # Errors
    ///
    /// Returns an error if `store_url` is not a valid Redis connection
    /// string.
    pub fn build(store_url: Option<&str>) -> anyhow::Result<Self> {
        let Some(url) = store_url else {
            tracing::info!("no store_url configured, using in-memory stores");
            return Ok(Self {
                health: Arc::new(InMemoryHealthStore::new()),
                families: Arc::new(InMemoryFamilyStore::new()),
                profiles: Arc::new(InMemoryProfileStore::new()),
                ledger: Arc::new(InMemoryLedger::new()),
            });
        };

        let client = redis::Client::open(url).map_err(|e| anyhow::anyhow!("invalid store_url: {e}"))?;
        Ok(Self {
            health: Arc::new(RedisHealthStore::new(url, "router")?),
            families: Arc::new(RedisFamilyStore::new(url)?),
            profiles: Arc::new(RedisProfileStore::new(url)?),
            ledger: Arc::new(RedisLedger::spawn(client, "router:ledger", Duration::from_secs(10))),
        })
    }
}
