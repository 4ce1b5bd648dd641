use secrecy::SecretString;
use serde::Deserialize;

/// Identity-token verification configuration (spec.md §4.1 step 1)
///
/// The gateway treats claim extraction as the IdP boundary (spec.md §1):
/// it verifies a bearer JWT's signature and structure locally against
/// `verification_secret` rather than calling out to a live IdP.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    pub verification_secret: SecretString,

    /// Cache TTL in seconds for resolved identities
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,

    /// Maximum number of cached identity resolutions
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

const fn default_cache_ttl() -> u64 {
    30
}

const fn default_cache_capacity() -> u64 {
    10_000
}
