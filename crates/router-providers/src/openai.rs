use std::time::{Duration, Instant};

use reqwest::Client;
use router_config::{ModelCfg, ProviderCfg, RateLimits};
use router_core::{ChatError, ChatRequest, ChatSuccess, ConversationMessage, ErrorCode, ResponseMeta, Role, TokenUsage};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::adapter::ProviderAdapter;
use crate::normalize::{classify_http_status, classify_transport_failure};
use crate::ratelimit::LocalRateLimiter;
use crate::secret::{SecretStore, SingleFlightSecret};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

impl From<&ConversationMessage> for OpenAiMessage {
    fn from(message: &ConversationMessage) -> Self {
        Self {
            role: match message.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: message.content.clone(),
        }
    }
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: OpenAiUsage,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// OpenAI chat-completions adapter (spec.md §4.2). Grounded on the
/// teacher's `provider/openai.rs`, stripped of streaming and header-rule
/// forwarding.
pub struct OpenAiAdapter {
    name: String,
    client: Client,
    base_url: Url,
    cfg: ProviderCfg,
    secret: SingleFlightSecret,
    rate_limiter: LocalRateLimiter,
}

impl OpenAiAdapter {
    /// # Panics
    ///
    /// Panics if the hardcoded default base URL is invalid (should never
    /// happen).
    pub fn new(name: impl Into<String>, cfg: ProviderCfg, secret_store: std::sync::Arc<dyn SecretStore>) -> Self {
        let name = name.into();
        let rate_limiter = LocalRateLimiter::from_tpm(cfg.rate_limits.tpm);
        let secret = SingleFlightSecret::new(secret_store, cfg.secret_id.clone());
        Self {
            name,
            client: Client::new(),
            base_url: Url::parse(DEFAULT_BASE_URL).expect("valid default URL"),
            cfg,
            secret,
            rate_limiter,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.as_str().trim_end_matches('/'))
    }

    async fn call_with_key(
        &self,
        body: &OpenAiRequest<'_>,
        api_key: &secrecy::SecretString,
    ) -> Result<ChatSuccess, ChatError> {
        use secrecy::ExposeSecret;

        let started = Instant::now();
        let response = tokio::time::timeout(
            REQUEST_TIMEOUT,
            self.client
                .post(self.completions_url())
                .bearer_auth(api_key.expose_secret())
                .json(body)
                .send(),
        )
        .await;

        let response = match response {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                let (code, retryable) = classify_transport_failure();
                return Err(
                    ChatError::new(code, self.name.clone()).with_detail("upstream request failed")
                        .with_retryable_override(retryable),
                );
            }
            Err(_) => {
                let (code, retryable) = classify_transport_failure();
                return Err(ChatError::new(code, self.name.clone())
                    .with_detail("request deadline exceeded")
                    .with_retryable_override(retryable));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let (code, retryable) = classify_http_status(status.as_u16(), &text);
            return Err(ChatError::new(code, self.name.clone())
                .with_status(status.as_u16())
                .with_detail(text)
                .with_retryable_override(retryable));
        }

        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let wire: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| ChatError::new(ErrorCode::Unknown, self.name.clone()).with_detail(format!("malformed response body: {e}")))?;

        let text = wire
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(ChatSuccess {
            text,
            token_usage: TokenUsage::new(wire.usage.prompt_tokens, wire.usage.completion_tokens),
            meta: ResponseMeta {
                provider: self.name.clone(),
                model: body.model.to_owned(),
                features: self
                    .cfg
                    .models
                    .get(body.model)
                    .map(|m| m.capabilities.clone())
                    .unwrap_or_default(),
                region: String::new(),
                latency_ms,
                timestamp: 0,
            },
        })
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_fulfill(&self, request: &ChatRequest, model: &str) -> bool {
        let Some(model_cfg) = self.cfg.models.get(model) else {
            return false;
        };
        model_cfg.active
            && request.required_capabilities.is_subset(&model_cfg.capabilities)
            && (!request.has_tools() || model_cfg.function_calling)
    }

    fn model_capabilities(&self, model: &str) -> Option<ModelCfg> {
        self.cfg.models.get(model).cloned()
    }

    fn limits(&self) -> RateLimits {
        self.cfg.rate_limits
    }

    async fn generate(&self, request: &ChatRequest, model: &str) -> Result<ChatSuccess, ChatError> {
        self.rate_limiter
            .check(&self.name, request.estimated_input_tokens() + request.max_tokens())?;

        let messages: Vec<OpenAiMessage> = request.assembled_messages().iter().map(OpenAiMessage::from).collect();
        let body = OpenAiRequest {
            model,
            messages,
            max_tokens: request.max_tokens(),
            temperature: request.temperature(),
        };

        let current = self
            .secret
            .current()
            .await
            .map_err(|e| {
                ChatError::new(ErrorCode::Auth, self.name.clone())
                    .with_status(500)
                    .with_detail(e.to_string())
                    .with_retryable_override(false)
            })?;

        match self.call_with_key(&body, &current).await {
            Err(err) if err.code == ErrorCode::Auth => {
                let Some(previous) = self.secret.previous().await.ok().flatten() else {
                    return Err(err);
                };
                self.secret.rotate_key();
                self.call_with_key(&body, &previous).await
            }
            result => result,
        }
    }
}
