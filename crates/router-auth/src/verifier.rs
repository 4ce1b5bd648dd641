use jwt_compact::alg::{Hs256, Hs256Key};
use jwt_compact::{AlgorithmExt, UntrustedToken};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::DenyReason;

/// Claims this gateway requires on a verified bearer token (spec.md §4.1 step 2)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    #[serde(rename = "familyId")]
    pub family_id: Option<String>,
    #[serde(rename = "profileId")]
    pub profile_id: Option<String>,
    pub region: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Verifies a bearer token and extracts identity claims
///
/// Spec.md §1 treats claim extraction as the IdP boundary: token
/// verification is local (signature + structure), not a call to a live IdP.
pub trait IdentityVerifier: Send + Sync {
    /// # Errors
    ///
    /// Returns `DenyReason::Unauthorized` if the token is malformed or fails
    /// signature verification.
    fn verify(&self, bearer_token: &str) -> Result<IdentityClaims, DenyReason>;
}

/// HS256 JWT verifier
pub struct JwtIdentityVerifier {
    key: Hs256Key,
}

impl JwtIdentityVerifier {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        Self {
            key: Hs256Key::new(secret.expose_secret().as_bytes()),
        }
    }
}

impl IdentityVerifier for JwtIdentityVerifier {
    fn verify(&self, bearer_token: &str) -> Result<IdentityClaims, DenyReason> {
        let untrusted = UntrustedToken::new(bearer_token).map_err(|_| DenyReason::Unauthorized)?;
        let token = Hs256
            .validator::<IdentityClaims>(&self.key)
            .validate(&untrusted)
            .map_err(|_| DenyReason::Unauthorized)?;
        Ok(token.claims().custom.clone())
    }
}
