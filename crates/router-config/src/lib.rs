#![allow(clippy::must_use_candidate)]

mod auth;
mod env;
mod health;
mod loader;
mod providers;
mod server;
mod store;

use serde::Deserialize;

pub use auth::AuthConfig;
pub use health::HealthConfig;
pub use providers::{
    CircuitBreakerConfig, ConfigSnapshot, FeatureFlags, ModelCfg, ProviderCfg, RateLimits, RetryConfig, RoutingConfig,
    RoutingRule, RoutingWeights, TokenCost,
};
pub use server::ServerConfig;
pub use store::ConfigStore;

/// Top-level router configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub auth: Option<AuthConfig>,
    #[serde(default)]
    pub snapshot: ConfigSnapshot,
}
