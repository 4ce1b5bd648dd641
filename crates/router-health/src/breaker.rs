use std::time::Duration;

use router_config::CircuitBreakerConfig;

use crate::record::{health_key, CircuitState, ProviderHealthRecord};
use crate::store::{HealthStoreError, ProviderHealthStore};

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// State machine over provider health records (spec.md §2 C3, §4.3)
///
/// Generic over the backing store so the same transition logic runs against
/// an in-process `DashMap` in tests and a shared Redis instance in
/// production.
pub struct CircuitBreakerManager<S> {
    store: S,
    config: CircuitBreakerConfig,
}

impl<S: ProviderHealthStore> CircuitBreakerManager<S> {
    pub const fn new(store: S, config: CircuitBreakerConfig) -> Self {
        Self { store, config }
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.record_ttl_seconds)
    }

    async fn load_or_new(&self, key: &str) -> Result<ProviderHealthRecord, HealthStoreError> {
        match self.store.get(key).await? {
            Some(record) => Ok(record),
            None => Ok(ProviderHealthRecord::new(key, now_millis())),
        }
    }

    /// Current record for `(provider, region)`, or a fresh CLOSED default
    /// if none exists yet — read-only, does not perform the OPEN→HALF_OPEN
    /// cooldown transition `is_allowed` does.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn record(&self, provider: &str, region: &str) -> Result<ProviderHealthRecord, HealthStoreError> {
        self.load_or_new(&health_key(provider, region)).await
    }

    /// Whether a request to `(provider, region)` is currently allowed
    ///
    /// An OPEN record past its cooldown is atomically advanced to HALF_OPEN
    /// as a side effect (spec.md §4.3), so the call both checks and, when
    /// due, performs the recovery transition.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read/write fails.
    pub async fn is_allowed(&self, provider: &str, region: &str) -> Result<bool, HealthStoreError> {
        let key = health_key(provider, region);
        let mut record = self.load_or_new(&key).await?;

        match record.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(true),
            CircuitState::Open => {
                let now = now_millis();
                let opened = record.opened_timestamp.unwrap_or(now);
                if now.saturating_sub(opened) >= self.config.cooldown_ms {
                    record.state = CircuitState::HalfOpen;
                    record.consecutive_failures = 0;
                    record.current_half_open_successes = 0;
                    record.last_state_change_timestamp = now;
                    self.store.put(&record, self.ttl()).await?;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }

    /// Record a successful upstream call against `(provider, region)`
    ///
    /// A success observed while the breaker reads as OPEN is treated as if
    /// it were HALF_OPEN (defensive — can close the breaker outright when
    /// `halfOpenSuccessThreshold == 1`) and logged at `warn` as anomalous,
    /// since `is_allowed` should have already advanced it past OPEN before
    /// the call was placed (spec.md §4.3, §9).
    ///
    /// # Errors
    ///
    /// Returns an error if the store read/write fails.
    pub async fn record_success(&self, provider: &str, region: &str) -> Result<(), HealthStoreError> {
        let key = health_key(provider, region);
        let mut record = self.load_or_new(&key).await?;
        let now = now_millis();

        record.total_successes += 1;

        match record.state {
            CircuitState::Closed => {
                record.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                record.current_half_open_successes += 1;
                if record.current_half_open_successes >= self.config.half_open_success_threshold {
                    record.state = CircuitState::Closed;
                    record.consecutive_failures = 0;
                    record.current_half_open_successes = 0;
                    record.opened_timestamp = None;
                    record.last_state_change_timestamp = now;
                }
            }
            CircuitState::Open => {
                tracing::warn!(provider, region, "success recorded while breaker reads OPEN");
                record.current_half_open_successes += 1;
                if record.current_half_open_successes >= self.config.half_open_success_threshold {
                    record.state = CircuitState::Closed;
                    record.consecutive_failures = 0;
                    record.current_half_open_successes = 0;
                    record.opened_timestamp = None;
                    record.last_state_change_timestamp = now;
                }
            }
        }

        self.store.put(&record, self.ttl()).await
    }

    /// `record_success`, plus folding `latency_ms` into the record's
    /// `avg_latency_ms` exponential moving average (spec.md §4.4 step 3's
    /// `c_latency` term reads this back).
    ///
    /// # Errors
    ///
    /// Returns an error if the store read/write fails.
    #[allow(clippy::cast_precision_loss)]
    pub async fn record_success_with_latency(
        &self,
        provider: &str,
        region: &str,
        latency_ms: u64,
    ) -> Result<(), HealthStoreError> {
        const EMA_ALPHA: f64 = 0.2;

        let key = health_key(provider, region);
        let mut record = self.load_or_new(&key).await?;
        let now = now_millis();
        let observed = latency_ms as f64;

        record.avg_latency_ms = Some(match record.avg_latency_ms {
            Some(avg) => EMA_ALPHA.mul_add(observed - avg, avg),
            None => observed,
        });
        record.total_successes += 1;

        match record.state {
            CircuitState::Closed => {
                record.consecutive_failures = 0;
            }
            CircuitState::HalfOpen | CircuitState::Open => {
                if record.state == CircuitState::Open {
                    tracing::warn!(provider, region, "success recorded while breaker reads OPEN");
                }
                record.current_half_open_successes += 1;
                if record.current_half_open_successes >= self.config.half_open_success_threshold {
                    record.state = CircuitState::Closed;
                    record.consecutive_failures = 0;
                    record.current_half_open_successes = 0;
                    record.opened_timestamp = None;
                    record.last_state_change_timestamp = now;
                }
            }
        }

        self.store.put(&record, self.ttl()).await
    }

    /// Record a failed upstream call against `(provider, region)`
    ///
    /// # Errors
    ///
    /// Returns an error if the store read/write fails.
    pub async fn record_failure(&self, provider: &str, region: &str) -> Result<(), HealthStoreError> {
        let key = health_key(provider, region);
        let mut record = self.load_or_new(&key).await?;
        let now = now_millis();

        record.total_failures += 1;
        record.consecutive_failures += 1;
        record.last_failure_timestamp = Some(now);

        match record.state {
            CircuitState::Closed => {
                if record.consecutive_failures >= self.config.failure_threshold {
                    record.state = CircuitState::Open;
                    record.opened_timestamp = Some(now);
                    record.last_state_change_timestamp = now;
                    tracing::warn!(provider, region, "circuit breaker opened");
                }
            }
            CircuitState::HalfOpen => {
                record.state = CircuitState::Open;
                record.current_half_open_successes = 0;
                record.opened_timestamp = Some(now);
                record.last_state_change_timestamp = now;
                tracing::warn!(provider, region, "half-open probe failed, circuit reopened");
            }
            CircuitState::Open => {
                // stay OPEN, preserve the original openedTimestamp
            }
        }

        self.store.put(&record, self.ttl()).await
    }
}
