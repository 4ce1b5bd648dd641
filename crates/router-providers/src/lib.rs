mod adapter;
mod anthropic;
mod normalize;
mod openai;
mod ratelimit;
mod secret;

pub use adapter::ProviderAdapter;
pub use anthropic::AnthropicAdapter;
pub use normalize::{classify_http_status, classify_transport_failure};
pub use openai::OpenAiAdapter;
pub use ratelimit::LocalRateLimiter;
pub use secret::{ProviderSecret, SecretError, SecretStore, SingleFlightSecret};
