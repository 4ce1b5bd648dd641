use router_config::{ModelCfg, RateLimits};
use router_core::{ChatError, ChatRequest, ChatSuccess};

/// Contract every concrete provider integration implements (spec.md §4.2).
///
/// `RotateKey` is deliberately not part of this trait: it is internal
/// machinery an adapter invokes on itself after an `AUTH` failure, never
/// called by the Router.
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// `true` iff `model` is known and its capability set is a superset of
    /// `request.required_capabilities`; if `request` carries tools, the
    /// model must also support `functionCalling`.
    fn can_fulfill(&self, request: &ChatRequest, model: &str) -> bool;

    fn model_capabilities(&self, model: &str) -> Option<ModelCfg>;

    fn limits(&self) -> RateLimits;

    /// Perform one upstream call. See spec.md §4.2 for the full contract
    /// (message assembly, rate-limit consumption, error normalization,
    /// latency reporting).
    async fn generate(&self, request: &ChatRequest, model: &str) -> Result<ChatSuccess, ChatError>;
}
