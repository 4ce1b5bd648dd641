use std::collections::HashMap;
use std::sync::Arc;

use router_config::{ConfigSnapshot, ModelCfg};
use router_core::{passes_rollout, ChatRequest};
use router_providers::ProviderAdapter;

/// An eligible `(provider, model)` pair for a request (spec.md §4.4 step 2)
#[derive(Debug, Clone)]
pub struct Candidate {
    pub provider: String,
    pub model: String,
    pub model_cfg: ModelCfg,
}

/// Enumerate every `(provider, model)` pair passing the eligibility gates:
/// both `active`, the rollout percentage admits this family/request, the
/// adapter reports `CanFulfill`, and (if set) `preferredProvider`/
/// `preferredModel` match (spec.md §4.4 step 2).
///
/// Iteration follows `snapshot.providers`'/`provider.models`' insertion
/// order (an `IndexMap`), so for identical inputs the candidate order is
/// deterministic before scoring, per spec.md §4.4's fairness requirement.
#[must_use]
pub fn enumerate_candidates(
    snapshot: &ConfigSnapshot,
    adapters: &HashMap<String, Arc<dyn ProviderAdapter>>,
    request: &ChatRequest,
    family_id: &str,
    request_id: &str,
) -> Vec<Candidate> {
    let mut out = Vec::new();

    for (provider_name, provider_cfg) in &snapshot.providers {
        if !provider_cfg.active {
            continue;
        }
        if let Some(preferred) = &request.preferred_provider {
            if preferred != provider_name {
                continue;
            }
        }
        if !passes_rollout(family_id, request_id, provider_cfg.rollout_percentage) {
            continue;
        }
        let Some(adapter) = adapters.get(provider_name) else {
            continue;
        };

        for (model_name, model_cfg) in &provider_cfg.models {
            if !model_cfg.active {
                continue;
            }
            if let Some(preferred_model) = &request.preferred_model {
                if preferred_model != model_name {
                    continue;
                }
            }
            if !passes_rollout(family_id, request_id, model_cfg.rollout_percentage) {
                continue;
            }
            if !adapter.can_fulfill(request, model_name) {
                continue;
            }

            out.push(Candidate {
                provider: provider_name.clone(),
                model: model_name.clone(),
                model_cfg: model_cfg.clone(),
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use router_config::{RateLimits, RetryConfig, TokenCost};
    use router_core::ChatSuccess;

    use super::*;

    struct StubAdapter {
        name: String,
        models: HashMap<String, ModelCfg>,
    }

    #[async_trait::async_trait]
    impl ProviderAdapter for StubAdapter {
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

        async fn generate(&self, _request: &ChatRequest, _model: &str) -> Result<ChatSuccess, router_core::ChatError> {
            unimplemented!("not exercised by candidate enumeration tests")
        }
    }

    fn model_cfg(active: bool, rollout: u8) -> ModelCfg {
        ModelCfg {
            active,
            rollout_percentage: rollout,
            token_cost: TokenCost::Flat(0.001),
            priority: 0,
            capabilities: HashSet::new(),
            context_size: 8_000,
            max_output_tokens: 1_000,
            streaming_support: false,
            function_calling: false,
            vision: false,
        }
    }

    fn request(prompt: &str) -> ChatRequest {
        ChatRequest {
            prompt: prompt.to_owned(),
            preferred_provider: None,
            preferred_model: None,
            max_tokens: None,
            temperature: None,
            streaming: None,
            required_capabilities: HashSet::new(),
            tools: Vec::new(),
            conversation_history: Vec::new(),
            estimated_input_tokens: None,
            estimated_output_tokens: None,
            config_id: None,
            meta: None,
        }
    }

    fn snapshot_with_one_provider(rollout: u8) -> ConfigSnapshot {
        let mut models = router_config::ProviderCfg {
            active: true,
            secret_id: "openai-key".to_owned(),
            default_model: "gpt".to_owned(),
            rate_limits: RateLimits::default(),
            retry_config: RetryConfig::default(),
            rollout_percentage: 100,
            models: indexmap::IndexMap::new(),
        };
        models.models.insert("gpt".to_owned(), model_cfg(true, rollout));

        let mut providers = indexmap::IndexMap::new();
        providers.insert("openai".to_owned(), models);

        ConfigSnapshot {
            version: 1,
            providers,
            routing: router_config::RoutingConfig::default(),
            feature_flags: router_config::FeatureFlags::default(),
            circuit_breaker: router_config::CircuitBreakerConfig::default(),
        }
    }

    fn adapters() -> HashMap<String, Arc<dyn ProviderAdapter>> {
        let mut models = HashMap::new();
        models.insert("gpt".to_owned(), model_cfg(true, 100));
        let adapter: Arc<dyn ProviderAdapter> = Arc::new(StubAdapter {
            name: "openai".to_owned(),
            models,
        });
        HashMap::from([("openai".to_owned(), adapter)])
    }

    #[test]
    fn zero_percent_rollout_excludes_the_model() {
        let snapshot = snapshot_with_one_provider(0);
        let candidates = enumerate_candidates(&snapshot, &adapters(), &request("hi"), "fam-1", "req-1");
        assert!(candidates.is_empty());
    }

    #[test]
    fn hundred_percent_rollout_admits_the_model() {
        let snapshot = snapshot_with_one_provider(100);
        let candidates = enumerate_candidates(&snapshot, &adapters(), &request("hi"), "fam-1", "req-1");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].provider, "openai");
    }

    #[test]
    fn preferred_provider_filters_out_others() {
        let snapshot = snapshot_with_one_provider(100);
        let mut req = request("hi");
        req.preferred_provider = Some("anthropic".to_owned());
        let candidates = enumerate_candidates(&snapshot, &adapters(), &req, "fam-1", "req-1");
        assert!(candidates.is_empty());
    }
}
