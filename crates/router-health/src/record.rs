use serde::{Deserialize, Serialize};

/// Circuit breaker state for one `(provider, region)` key (spec.md §4.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Persisted health record for one `(provider, region)` key
///
/// Keyed by the store as `"<provider>#<region>"` (spec.md §4.3). Every write
/// refreshes the record's TTL to `now + recordTtlSeconds`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealthRecord {
    pub key: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub current_half_open_successes: u32,
    pub total_successes: u64,
    pub total_failures: u64,
    /// Unix millis the breaker most recently transitioned to OPEN
    pub opened_timestamp: Option<u64>,
    pub last_failure_timestamp: Option<u64>,
    pub last_state_change_timestamp: u64,
    /// Exponential moving average of observed success latency, consumed by
    /// the Router's `c_latency` scoring term (spec.md §4.4 step 3)
    #[serde(default)]
    pub avg_latency_ms: Option<f64>,
}

impl ProviderHealthRecord {
    #[must_use]
    pub fn new(key: impl Into<String>, now: u64) -> Self {
        Self {
            key: key.into(),
            state: CircuitState::Closed,
            consecutive_failures: 0,
            current_half_open_successes: 0,
            total_successes: 0,
            total_failures: 0,
            opened_timestamp: None,
            last_failure_timestamp: None,
            last_state_change_timestamp: now,
            avg_latency_ms: None,
        }
    }
}

/// The store key for a `(provider, region)` pair (spec.md §4.3)
#[must_use]
pub fn health_key(provider: &str, region: &str) -> String {
    format!("{provider}#{region}")
}
