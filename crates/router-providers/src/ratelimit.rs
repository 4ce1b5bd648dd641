use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use router_core::{ChatError, ErrorCode};

/// Local per-adapter token-bucket, sized from `ProviderCfg.rate_limits.tpm`
/// (spec.md §4.2, §5). Exhaustion denies without contacting the upstream
/// and without a breaker failure record.
pub struct LocalRateLimiter {
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl LocalRateLimiter {
    #[must_use]
    pub fn from_tpm(tpm: Option<u32>) -> Self {
        let limiter = tpm.and_then(NonZeroU32::new).map(|tpm| {
            let quota = Quota::per_minute(tpm).allow_burst(tpm);
            RateLimiter::direct(quota)
        });
        Self { limiter }
    }

    /// Consume `estimated_tokens` cells from the bucket.
    ///
    /// # Errors
    ///
    /// `Error{RATE_LIMIT, retryable=true}` if the bucket has no capacity
    /// left, or if `estimated_tokens` permanently exceeds the bucket's
    /// configured burst size.
    pub fn check(&self, provider: &str, estimated_tokens: u32) -> Result<(), ChatError> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };
        let n = NonZeroU32::new(estimated_tokens).unwrap_or(NonZeroU32::MIN);
        match limiter.check_n(n) {
            Ok(Ok(())) => Ok(()),
            _ => Err(ChatError::new(ErrorCode::RateLimit, provider.to_owned())
                .with_detail("local rate-limit bucket exhausted")),
        }
    }
}
