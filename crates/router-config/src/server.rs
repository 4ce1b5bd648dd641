use std::net::SocketAddr;

use serde::Deserialize;

use crate::health::HealthConfig;

/// Gateway bind address and ambient HTTP concerns (spec.md §6)
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_address: Option<SocketAddr>,
    #[serde(default)]
    pub health: HealthConfig,
    /// Redis connection URL backing health/family/profile/ledger stores
    pub store_url: Option<String>,
}
