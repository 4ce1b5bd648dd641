use http::StatusCode;

/// Trait for domain errors that can be converted to HTTP responses
///
/// Implemented by each feature crate's error type. The gateway layer
/// converts these into actual HTTP responses, keeping domain errors
/// decoupled from axum.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error type (e.g. `invalid_request_error`)
    fn error_type(&self) -> &str;

    /// Message safe to expose to API consumers
    fn client_message(&self) -> String;
}

/// Canonical upstream/admission error taxonomy (spec.md §4.2, §7)
///
/// Adapters normalize every heterogeneous upstream failure into one of
/// these before the Router ever sees it. `NoModelAvailable` and
/// `InternalError` only ever originate from the Router itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Upstream rejected the request for exceeding a rate limit
    RateLimit,
    /// Upstream rejected credentials or permissions
    Auth,
    /// Upstream flagged the content (moderation, 409/422)
    Content,
    /// Model unknown, or request shape the model cannot serve
    Capability,
    /// Upstream timed out, errored at the transport level, or returned 5xx
    Timeout,
    /// Anything that does not fit the above
    Unknown,
    /// The Router exhausted every candidate without a success
    NoModelAvailable,
    /// An unexpected failure escaped the core
    InternalError,
}

impl ErrorCode {
    /// Whether an error of this class should trigger a Router fallback
    /// attempt against the next candidate (spec.md §4.4, §7)
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimit | Self::Timeout | Self::Auth)
    }

    /// Whether this error should count against provider health (spec.md §4.4 step 4)
    ///
    /// `Content` and `Capability` are request-intrinsic and never touch the
    /// breaker; every other code does.
    #[must_use]
    pub const fn counts_against_health(self) -> bool {
        !matches!(self, Self::Content | Self::Capability)
    }

    /// Default HTTP status for this error class (spec.md §6, §7)
    #[must_use]
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            Self::Auth => StatusCode::UNAUTHORIZED,
            Self::Content | Self::Capability => StatusCode::BAD_REQUEST,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Unknown | Self::NoModelAvailable | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
