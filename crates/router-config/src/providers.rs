use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Deserialize;

/// Immutable, versioned view of active providers, models, rollout
/// percentages, cost table, routing weights, and feature flags (spec.md §2
/// C1, §3 "Config Snapshot").
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSnapshot {
    /// Monotonically increasing version, bumped on every reload
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub providers: IndexMap<String, ProviderCfg>,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub feature_flags: FeatureFlags,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
}

/// Per-provider configuration (spec.md §3)
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderCfg {
    #[serde(default = "default_true")]
    pub active: bool,
    /// Key under which the adapter's credential is looked up in `SecretStore`
    pub secret_id: String,
    pub default_model: String,
    #[serde(default)]
    pub rate_limits: RateLimits,
    #[serde(default)]
    pub retry_config: RetryConfig,
    #[serde(default = "default_rollout_percentage")]
    pub rollout_percentage: u8,
    #[serde(default)]
    pub models: IndexMap<String, ModelCfg>,
}

/// Per-model configuration (spec.md §3)
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelCfg {
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_rollout_percentage")]
    pub rollout_percentage: u8,
    pub token_cost: TokenCost,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub capabilities: HashSet<String>,
    #[serde(default)]
    pub context_size: u32,
    #[serde(default)]
    pub max_output_tokens: u32,
    #[serde(default)]
    pub streaming_support: bool,
    #[serde(default)]
    pub function_calling: bool,
    #[serde(default)]
    pub vision: bool,
}

/// Cost per token, either a single flat rate or split prompt/completion rates
/// (spec.md §3: `tokenCost` is "flat OR `{prompt, completion}`")
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum TokenCost {
    Flat(f64),
    Split { prompt: f64, completion: f64 },
}

impl TokenCost {
    /// Blended per-token cost for a request with the given prompt/completion
    /// token counts, used by the router's cost-weighted score.
    #[must_use]
    pub fn blended(&self, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        match *self {
            Self::Flat(rate) => rate,
            Self::Split { prompt, completion } => {
                let total = f64::from(prompt_tokens + completion_tokens);
                if total <= 0.0 {
                    return (prompt + completion) / 2.0;
                }
                (prompt * f64::from(prompt_tokens) + completion * f64::from(completion_tokens)) / total
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimits {
    #[serde(default)]
    pub rpm: Option<u32>,
    #[serde(default)]
    pub tpm: Option<u32>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_initial_delay_ms() -> u64 {
    200
}

const fn default_max_delay_ms() -> u64 {
    2_000
}

const fn default_true() -> bool {
    true
}

const fn default_rollout_percentage() -> u8 {
    100
}

/// Routing weights and static defaults (spec.md §3, §4.4)
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    #[serde(default)]
    pub weights: RoutingWeights,
    pub default_provider: Option<String>,
    pub default_model: Option<String>,
    #[serde(default)]
    pub rules: Vec<RoutingRule>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            weights: RoutingWeights::default(),
            default_provider: None,
            default_model: None,
            rules: Vec::new(),
        }
    }
}

/// Weights applied to the four scoring dimensions; must sum to 1.0
/// (spec.md §4.4)
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingWeights {
    #[serde(default = "default_cost_weight")]
    pub cost: f64,
    #[serde(default = "default_quality_weight")]
    pub quality: f64,
    #[serde(default = "default_latency_weight")]
    pub latency: f64,
    #[serde(default = "default_availability_weight")]
    pub availability: f64,
}

impl Default for RoutingWeights {
    fn default() -> Self {
        Self {
            cost: default_cost_weight(),
            quality: default_quality_weight(),
            latency: default_latency_weight(),
            availability: default_availability_weight(),
        }
    }
}

impl RoutingWeights {
    /// Whether the four weights sum to 1.0 within floating-point tolerance
    #[must_use]
    pub fn is_normalized(&self) -> bool {
        (self.cost + self.quality + self.latency + self.availability - 1.0).abs() < 1e-6
    }
}

const fn default_cost_weight() -> f64 {
    0.25
}

const fn default_quality_weight() -> f64 {
    0.25
}

const fn default_latency_weight() -> f64 {
    0.25
}

const fn default_availability_weight() -> f64 {
    0.25
}

/// A routing override rule, matched against request attributes before
/// falling back to scored candidate selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingRule {
    pub matches_capability: Option<String>,
    pub route_to_provider: String,
    pub route_to_model: Option<String>,
}

/// Named boolean toggles, looked up by call sites that guard optional
/// behavior (e.g. a provider integration still under evaluation).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct FeatureFlags(pub std::collections::HashMap<String, bool>);

impl FeatureFlags {
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }
}

/// Circuit breaker tunables (spec.md §4.3)
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CircuitBreakerConfig {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default = "default_half_open_success_threshold")]
    pub half_open_success_threshold: u32,
    #[serde(default = "default_record_ttl_seconds")]
    pub record_ttl_seconds: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_ms: default_cooldown_ms(),
            half_open_success_threshold: default_half_open_success_threshold(),
            record_ttl_seconds: default_record_ttl_seconds(),
        }
    }
}

const fn default_failure_threshold() -> u32 {
    3
}

const fn default_cooldown_ms() -> u64 {
    30_000
}

const fn default_half_open_success_threshold() -> u32 {
    2
}

const fn default_record_ttl_seconds() -> u64 {
    7 * 24 * 60 * 60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_are_normalized() {
        assert!(RoutingWeights::default().is_normalized());
    }

    #[test]
    fn split_token_cost_blends_by_usage() {
        let cost = TokenCost::Split {
            prompt: 0.002,
            completion: 0.003,
        };
        let blended = cost.blended(100, 100);
        assert!((blended - 0.0025).abs() < 1e-9);
    }

    #[test]
    fn feature_flag_defaults_to_disabled() {
        let flags = FeatureFlags::default();
        assert!(!flags.is_enabled("anything"));
    }
}
