use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use router_auth::FamilyStore;
use router_config::{ConfigSnapshot, ConfigStore};
use router_core::{ChatError, ChatRequest, ChatSuccess, ErrorCode, Identity, LedgerEntry};
use router_health::{CircuitBreakerManager, ProviderHealthStore};
use router_providers::ProviderAdapter;

use crate::candidate::enumerate_candidates;
use crate::ledger::TokenLedger;
use crate::scoring::score_candidates;

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Source of the active `ConfigSnapshot` (spec.md §4.4 step 1: "Load
/// snapshot by configured id"). `ConfigStore` is the production
/// implementation; this indirection exists so routing tests can supply a
/// fixed snapshot without loading TOML from disk.
pub trait SnapshotSource: Send + Sync {
    fn current_snapshot(&self) -> Arc<ConfigSnapshot>;
}

impl SnapshotSource for ConfigStore {
    fn current_snapshot(&self) -> Arc<ConfigSnapshot> {
        self.snapshot()
    }
}

/// Multi-tenant request router (spec.md §4.4): loads the active config
/// snapshot, scores every eligible `(provider, model)` candidate, and
/// attempts them in order with circuit-breaker gating and bounded
/// fallback, writing a Ledger Entry on the first success.
pub struct ModelRouter<S, C = ConfigStore> {
    config: Arc<C>,
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
    breaker: Arc<CircuitBreakerManager<S>>,
    ledger: Arc<dyn TokenLedger>,
    families: Arc<dyn FamilyStore>,
}

impl<S: ProviderHealthStore, C: SnapshotSource> ModelRouter<S, C> {
    #[must_use]
    pub fn new(
        config: Arc<C>,
        adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
        breaker: Arc<CircuitBreakerManager<S>>,
        ledger: Arc<dyn TokenLedger>,
        families: Arc<dyn FamilyStore>,
    ) -> Self {
        Self {
            config,
            adapters,
            breaker,
            ledger,
            families,
        }
    }

    /// Run the full pipeline for one request (spec.md §4.4 steps 1-5).
    ///
    /// # Errors
    ///
    /// Returns the last observed upstream error, or `Error{UNKNOWN,
    /// code=NO_MODEL_AVAILABLE, retryable=false}` if no candidate was ever
    /// attempted (spec.md §4.4 step 5).
    pub async fn route(&self, request: &ChatRequest, identity: &Identity) -> Result<ChatSuccess, ChatError> {
        let snapshot = self.config.current_snapshot();
        let request_id = request.meta.as_ref().map_or_else(|| "unscoped".to_owned(), |m| m.request_id.clone());

        let candidates = enumerate_candidates(&snapshot, &self.adapters, request, identity.family_id.as_str(), &request_id);

        if candidates.is_empty() {
            return Err(no_model_available("no candidate passed the eligibility gates"));
        }

        let mut health = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            let record = self
                .breaker
                .record(&candidate.provider, &identity.home_region)
                .await
                .map_err(|e| ChatError::new(ErrorCode::InternalError, None::<String>).with_detail(e.to_string()))?;
            health.push(record);
        }

        let scored = score_candidates(candidates, health, request, &snapshot.routing.weights);

        let mut last_error: Option<ChatError> = None;
        let mut attempt: u32 = 0;

        for scored_candidate in scored {
            let provider = scored_candidate.candidate.provider;
            let model = scored_candidate.candidate.model;

            let allowed = self.breaker.is_allowed(&provider, &identity.home_region).await.unwrap_or(false);
            if !allowed {
                continue;
            }

            let Some(adapter) = self.adapters.get(&provider) else {
                continue;
            };

            let started = Instant::now();
            match adapter.generate(request, &model).await {
                Ok(mut success) => {
                    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                    let _ = self
                        .breaker
                        .record_success_with_latency(&provider, &identity.home_region, latency_ms)
                        .await;

                    success.meta.region.clone_from(&identity.home_region);
                    success.meta.latency_ms = latency_ms;
                    success.meta.timestamp = now_millis();

                    let entry = ledger_entry(&snapshot, &request_id, identity, &provider, &model, &success);
                    let debit_amount = cost_to_tokens(entry.cost);
                    self.ledger.append(entry);

                    let families = Arc::clone(&self.families);
                    let family_id = identity.family_id.clone();
                    tokio::spawn(async move {
                        if let Err(e) = families.debit(&family_id, debit_amount).await {
                            tracing::warn!(error = %e, %family_id, "best-effort family debit failed");
                        }
                    });

                    return Ok(success);
                }
                Err(err) => {
                    attempt += 1;
                    if matches!(err.code, ErrorCode::Content | ErrorCode::Capability) {
                        return Err(err);
                    }

                    let local_rate_limit = err.code == ErrorCode::RateLimit && err.status.is_none();
                    if !local_rate_limit {
                        let _ = self.breaker.record_failure(&provider, &identity.home_region).await;
                    }
                    if err.retryable {
                        tokio::time::sleep(backoff_delay(&snapshot, &provider, attempt)).await;
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| no_model_available("no candidate was attempted")))
    }
}

/// `tokenBalance` is tracked as an integer token count (spec.md §3's
/// `Family.tokenBalance`), so the debit amount — `tokens.total · tokenCost`
/// — is rounded to the nearest whole token (spec.md §4.4 step 4c).
#[allow(clippy::cast_possible_truncation)]
fn cost_to_tokens(cost: f64) -> i64 {
    cost.round() as i64
}

fn no_model_available(detail: &str) -> ChatError {
    ChatError::new(ErrorCode::NoModelAvailable, None::<String>)
        .with_detail(detail.to_owned())
        .with_retryable_override(false)
}

/// Bounded exponential backoff before falling over to the next candidate
/// (spec.md §4.4 step 4d), sized from the attempted provider's own
/// `retryConfig` rather than a router-wide constant.
fn backoff_delay(snapshot: &ConfigSnapshot, provider: &str, attempt: u32) -> Duration {
    let retry_config = snapshot.providers.get(provider).map(|p| p.retry_config).unwrap_or_default();
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    let delay_ms = retry_config.initial_delay_ms.saturating_mul(factor).min(retry_config.max_delay_ms);
    Duration::from_millis(delay_ms)
}

fn ledger_entry(
    snapshot: &ConfigSnapshot,
    request_id: &str,
    identity: &Identity,
    provider: &str,
    model: &str,
    success: &ChatSuccess,
) -> LedgerEntry {
    let cost = snapshot.providers.get(provider).and_then(|p| p.models.get(model)).map_or(0.0, |m| {
        m.token_cost.blended(success.token_usage.prompt, success.token_usage.completion) * f64::from(success.token_usage.total)
    });

    LedgerEntry {
        request_id: request_id.to_owned(),
        family_id: identity.family_id.clone(),
        provider: provider.to_owned(),
        model: model.to_owned(),
        prompt_tokens: success.token_usage.prompt,
        completion_tokens: success.token_usage.completion,
        cost,
        timestamp: success.meta.timestamp,
        success: true,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use router_auth::InMemoryFamilyStore;
    use router_config::{CircuitBreakerConfig, FeatureFlags, ModelCfg, ProviderCfg, RateLimits, RetryConfig, RoutingConfig, RoutingWeights, TokenCost};
    use router_core::{ErrorCode, FamilyId, ProfileId, ResponseMeta, TokenUsage};
    use router_health::InMemoryHealthStore;

    use super::*;
    use crate::ledger::InMemoryLedger;

    fn families() -> Arc<InMemoryFamilyStore> {
        let store = InMemoryFamilyStore::new();
        store.seed(router_core::Family {
            family_id: FamilyId::new("us-east-1", "fam-1"),
            token_balance: 1_000,
            pause_status_family: false,
            primary_region: "us-east-1".to_owned(),
        });
        Arc::new(store)
    }

    struct StaticAdapter {
        name: String,
        models: HashMap<String, ModelCfg>,
        outcome: fn() -> Result<ChatSuccess, ChatError>,
    }

    #[async_trait::async_trait]
    impl ProviderAdapter for StaticAdapter {
        fn name(&self) -> &str {
            &self.name
        }

        fn can_fulfill(&self, request: &ChatRequest, model: &str) -> bool {
            self.models
                .get(model)
                .is_some_and(|m| m.active && request.required_capabilities.is_subset(&m.capabilities))
        }

        fn model_capabilities(&self, model: &str) -> Option<ModelCfg> {
            self.models.get(model).cloned()
        }

        fn limits(&self) -> RateLimits {
            RateLimits::default()
        }

        async fn generate(&self, _request: &ChatRequest, _model: &str) -> Result<ChatSuccess, ChatError> {
            (self.outcome)()
        }
    }

    fn model_cfg(priority: i32, flat_cost: f64) -> ModelCfg {
        ModelCfg {
            active: true,
            rollout_percentage: 100,
            token_cost: TokenCost::Flat(flat_cost),
            priority,
            capabilities: HashSet::new(),
            context_size: 8_000,
            max_output_tokens: 1_000,
            streaming_support: false,
            function_calling: false,
            vision: false,
        }
    }

    fn provider_cfg(secret_id: &str, default_model: &str, model_name: &str, model: ModelCfg) -> ProviderCfg {
        let mut models = indexmap::IndexMap::new();
        models.insert(model_name.to_owned(), model);
        ProviderCfg {
            active: true,
            secret_id: secret_id.to_owned(),
            default_model: default_model.to_owned(),
            rate_limits: RateLimits::default(),
            retry_config: RetryConfig::default(),
            rollout_percentage: 100,
            models,
        }
    }

    /// A fixed snapshot for routing tests — stands in for `ConfigStore`
    /// without needing a TOML file on disk.
    struct StaticSnapshot(Arc<ConfigSnapshot>);

    impl SnapshotSource for StaticSnapshot {
        fn current_snapshot(&self) -> Arc<ConfigSnapshot> {
            Arc::clone(&self.0)
        }
    }

    fn config_store(providers: Vec<(&str, ProviderCfg)>, weights: RoutingWeights) -> Arc<StaticSnapshot> {
        let mut map = indexmap::IndexMap::new();
        for (name, cfg) in providers {
            map.insert(name.to_owned(), cfg);
        }
        let snapshot = ConfigSnapshot {
            version: 1,
            providers: map,
            routing: RoutingConfig {
                weights,
                default_provider: None,
                default_model: None,
                rules: Vec::new(),
            },
            feature_flags: FeatureFlags::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
        };
        Arc::new(StaticSnapshot(Arc::new(snapshot)))
    }

    fn identity() -> Identity {
        Identity {
            user_id: "user-1".to_owned(),
            family_id: FamilyId::new("us-east-1", "fam-1"),
            profile_id: ProfileId::new("us-east-1", "prof-1"),
            role: "member".to_owned(),
            home_region: "us-east-1".to_owned(),
            is_authenticated: true,
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            prompt: "Hello".to_owned(),
            preferred_provider: None,
            preferred_model: None,
            max_tokens: None,
            temperature: None,
            streaming: None,
            required_capabilities: HashSet::new(),
            tools: Vec::new(),
            conversation_history: Vec::new(),
            estimated_input_tokens: Some(10),
            estimated_output_tokens: Some(20),
            config_id: None,
            meta: None,
        }
    }

    fn success(provider: &str) -> Result<ChatSuccess, ChatError> {
        Ok(ChatSuccess {
            text: "hi".to_owned(),
            token_usage: TokenUsage::new(10, 20),
            meta: ResponseMeta {
                provider: provider.to_owned(),
                model: "m".to_owned(),
                features: HashSet::new(),
                region: String::new(),
                latency_ms: 0,
                timestamp: 0,
            },
        })
    }

    #[tokio::test]
    async fn cheaper_provider_wins_under_cost_heavy_weights() {
        let cheap = provider_cfg("b-key", "m", "m", model_cfg(0, 0.00025));
        let expensive = provider_cfg("a-key", "m", "m", model_cfg(0, 0.002));
        let config = config_store(
            vec![("anthropic", cheap), ("openai", expensive)],
            RoutingWeights {
                cost: 0.8,
                quality: 0.1,
                latency: 0.05,
                availability: 0.05,
            },
        );

        let mut adapters: HashMap<String, Arc<dyn ProviderAdapter>> = HashMap::new();
        adapters.insert(
            "anthropic".to_owned(),
            Arc::new(StaticAdapter {
                name: "anthropic".to_owned(),
                models: HashMap::from([("m".to_owned(), model_cfg(0, 0.00025))]),
                outcome: || success("anthropic"),
            }),
        );
        adapters.insert(
            "openai".to_owned(),
            Arc::new(StaticAdapter {
                name: "openai".to_owned(),
                models: HashMap::from([("m".to_owned(), model_cfg(0, 0.002))]),
                outcome: || success("openai"),
            }),
        );

        let breaker = Arc::new(CircuitBreakerManager::new(InMemoryHealthStore::new(), CircuitBreakerConfig::default()));
        let ledger = Arc::new(InMemoryLedger::new());
        let router = ModelRouter::new(config, adapters, breaker, ledger.clone(), families());

        let result = router.route(&request(), &identity()).await.unwrap();
        assert_eq!(result.meta.provider, "anthropic");
        assert_eq!(ledger.entries().len(), 1);
        assert_eq!(ledger.entries()[0].provider, "anthropic");
    }

    #[tokio::test]
    async fn preferred_provider_overrides_cost_ranking() {
        let cheap = provider_cfg("b-key", "m", "m", model_cfg(0, 0.00025));
        let expensive = provider_cfg("a-key", "m", "m", model_cfg(0, 0.002));
        let config = config_store(
            vec![("anthropic", cheap), ("openai", expensive)],
            RoutingWeights {
                cost: 0.8,
                quality: 0.1,
                latency: 0.05,
                availability: 0.05,
            },
        );

        let mut adapters: HashMap<String, Arc<dyn ProviderAdapter>> = HashMap::new();
        adapters.insert(
            "anthropic".to_owned(),
            Arc::new(StaticAdapter {
                name: "anthropic".to_owned(),
                models: HashMap::from([("m".to_owned(), model_cfg(0, 0.00025))]),
                outcome: || success("anthropic"),
            }),
        );
        adapters.insert(
            "openai".to_owned(),
            Arc::new(StaticAdapter {
                name: "openai".to_owned(),
                models: HashMap::from([("m".to_owned(), model_cfg(0, 0.002))]),
                outcome: || success("openai"),
            }),
        );

        let breaker = Arc::new(CircuitBreakerManager::new(InMemoryHealthStore::new(), CircuitBreakerConfig::default()));
        let ledger = Arc::new(InMemoryLedger::new());
        let router = ModelRouter::new(config, adapters, breaker, ledger, families());

        let mut req = request();
        req.preferred_provider = Some("openai".to_owned());
        let result = router.route(&req, &identity()).await.unwrap();
        assert_eq!(result.meta.provider, "openai");
    }

    #[tokio::test]
    async fn all_providers_open_yields_no_model_available_with_zero_upstream_calls() {
        let cfg_a = provider_cfg("a-key", "m", "m", model_cfg(0, 0.001));
        let cfg_b = provider_cfg("b-key", "m", "m", model_cfg(0, 0.001));
        let config = config_store(vec![("a", cfg_a), ("b", cfg_b)], RoutingWeights::default());

        let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let calls_a = calls.clone();
        let calls_b = calls.clone();

        struct CountingAdapter {
            name: String,
            models: HashMap<String, ModelCfg>,
            calls: Arc<std::sync::atomic::AtomicU32>,
        }

        #[async_trait::async_trait]
        impl ProviderAdapter for CountingAdapter {
            fn name(&self) -> &str {
                &self.name
            }
            fn can_fulfill(&self, _request: &ChatRequest, model: &str) -> bool {
                self.models.contains_key(model)
            }
            fn model_capabilities(&self, model: &str) -> Option<ModelCfg> {
                self.models.get(model).cloned()
            }
            fn limits(&self) -> RateLimits {
                RateLimits::default()
            }
            async fn generate(&self, _request: &ChatRequest, _model: &str) -> Result<ChatSuccess, ChatError> {
                // Should never run: both providers' breakers are OPEN before
                // the router ever reaches the attempt loop's adapter call.
                self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                success("unused")
            }
        }

        let mut adapters: HashMap<String, Arc<dyn ProviderAdapter>> = HashMap::new();
        adapters.insert(
            "a".to_owned(),
            Arc::new(CountingAdapter {
                name: "a".to_owned(),
                models: HashMap::from([("m".to_owned(), model_cfg(0, 0.001))]),
                calls: calls_a,
            }),
        );
        adapters.insert(
            "b".to_owned(),
            Arc::new(CountingAdapter {
                name: "b".to_owned(),
                models: HashMap::from([("m".to_owned(), model_cfg(0, 0.001))]),
                calls: calls_b,
            }),
        );

        let breaker = Arc::new(CircuitBreakerManager::new(InMemoryHealthStore::new(), CircuitBreakerConfig::default()));
        for provider in ["a", "b"] {
            for _ in 0..3 {
                breaker.record_failure(provider, "us-east-1").await.unwrap();
            }
        }

        let ledger = Arc::new(InMemoryLedger::new());
        let router = ModelRouter::new(config, adapters, breaker, ledger, families());

        let err = router.route(&request(), &identity()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NoModelAvailable);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn content_error_is_surfaced_without_fallback() {
        let cfg_a = provider_cfg("a-key", "m", "m", model_cfg(0, 0.001));
        let cfg_b = provider_cfg("b-key", "m", "m", model_cfg(0, 0.001));
        let config = config_store(vec![("a", cfg_a), ("b", cfg_b)], RoutingWeights::default());

        let mut adapters: HashMap<String, Arc<dyn ProviderAdapter>> = HashMap::new();
        adapters.insert(
            "a".to_owned(),
            Arc::new(StaticAdapter {
                name: "a".to_owned(),
                models: HashMap::from([("m".to_owned(), model_cfg(0, 0.001))]),
                outcome: || Err(ChatError::new(ErrorCode::Content, "a".to_owned())),
            }),
        );
        adapters.insert(
            "b".to_owned(),
            Arc::new(StaticAdapter {
                name: "b".to_owned(),
                models: HashMap::from([("m".to_owned(), model_cfg(0, 0.001))]),
                outcome: || success("b"),
            }),
        );

        let breaker = Arc::new(CircuitBreakerManager::new(InMemoryHealthStore::new(), CircuitBreakerConfig::default()));
        let ledger = Arc::new(InMemoryLedger::new());
        let router = ModelRouter::new(config, adapters, breaker, ledger.clone(), families());

        let mut req = request();
        req.preferred_provider = Some("a".to_owned());
        let err = router.route(&req, &identity()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Content);
        assert!(ledger.entries().is_empty());
    }
}
