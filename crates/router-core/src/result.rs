use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ErrorCode;
use crate::identity::FamilyId;

/// Token counts for a completed request (spec.md §3)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt: u32,
    pub completion: u32,
    pub total: u32,
}

impl TokenUsage {
    #[must_use]
    pub const fn new(prompt: u32, completion: u32) -> Self {
        Self {
            prompt,
            completion,
            total: prompt + completion,
        }
    }
}

/// Metadata attached to a successful response (spec.md §3, §6)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub provider: String,
    pub model: String,
    pub features: HashSet<String>,
    pub region: String,
    pub latency_ms: u64,
    pub timestamp: u64,
}

/// A successful completion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSuccess {
    pub text: String,
    pub token_usage: TokenUsage,
    pub meta: ResponseMeta,
}

/// A failed attempt, normalized at the adapter boundary (spec.md §3, §4.2)
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("{code:?} from {provider:?}: {detail:?}")]
pub struct ChatError {
    pub code: ErrorCode,
    pub provider: Option<String>,
    pub status: Option<u16>,
    pub retryable: bool,
    pub detail: Option<String>,
}

impl ChatError {
    #[must_use]
    pub fn new(code: ErrorCode, provider: impl Into<Option<String>>) -> Self {
        let retryable = code.is_retryable();
        Self {
            code,
            provider: provider.into(),
            status: None,
            retryable,
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Override the `retryable` flag `ErrorCode::is_retryable` would have
    /// assigned — needed for the normalization table's few exceptions
    /// (spec.md §4.2: `UNKNOWN` is retryable only for `status >= 500`).
    #[must_use]
    pub const fn with_retryable_override(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}

impl crate::error::HttpError for ChatError {
    fn status_code(&self) -> http::StatusCode {
        self.code.status_code()
    }

    fn error_type(&self) -> &str {
        match self.code {
            ErrorCode::RateLimit => "rate_limit_error",
            ErrorCode::Auth => "authentication_error",
            ErrorCode::Content => "content_error",
            ErrorCode::Capability => "capability_error",
            ErrorCode::Timeout => "timeout_error",
            ErrorCode::Unknown => "unknown_error",
            ErrorCode::NoModelAvailable => "no_model_available",
            ErrorCode::InternalError => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        self.detail.clone().unwrap_or_else(|| self.to_string())
    }
}

/// Append-only accounting record for one successful upstream call (spec.md §3)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub request_id: String,
    pub family_id: FamilyId,
    pub provider: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub cost: f64,
    pub timestamp: u64,
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_usage_total_is_sum() {
        let usage = TokenUsage::new(10, 20);
        assert_eq!(usage.total, 30);
    }

    #[test]
    fn chat_error_defaults_retryable_from_code() {
        let err = ChatError::new(ErrorCode::RateLimit, "openai".to_owned());
        assert!(err.retryable);
        let err = ChatError::new(ErrorCode::Content, "openai".to_owned());
        assert!(!err.retryable);
    }
}
