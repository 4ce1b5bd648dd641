use std::sync::Arc;

use router_core::{FamilyId, Identity, ProfileId};

use crate::error::DenyReason;
use crate::family_store::FamilyStore;
use crate::profile_store::ProfileStore;
use crate::verifier::IdentityVerifier;

/// `Authorize(bearerToken, routeArn) -> Allow(Identity) | Deny(reason)`
/// (spec.md §4.1)
pub struct AdmissionAuthorizer {
    verifier: Arc<dyn IdentityVerifier>,
    families: Arc<dyn FamilyStore>,
    profiles: Arc<dyn ProfileStore>,
}

impl AdmissionAuthorizer {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        families: Arc<dyn FamilyStore>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            verifier,
            families,
            profiles,
        }
    }

    /// # Errors
    ///
    /// Returns the first applicable `DenyReason`; the Authorizer never
    /// retries a failed step (spec.md §4.1 "Failure semantics").
    pub async fn authorize(&self, bearer_token: &str, _route_arn: &str) -> Result<Identity, DenyReason> {
        // Step 1: delegate token verification to the (local) IdP boundary.
        let claims = self.verifier.verify(bearer_token)?;

        // Step 2: extract mandatory identity attributes.
        let (Some(user_id), Some(family_id_raw), Some(profile_id_raw), Some(region)) =
            (claims.user_id, claims.family_id, claims.profile_id, claims.region)
        else {
            return Err(DenyReason::IncompleteIdentity);
        };
        let family_id = FamilyId::new(&region, &family_id_raw);
        let profile_id = ProfileId::new(&region, &profile_id_raw);

        // Step 3: load Profile.
        let profile = self
            .profiles
            .get(&profile_id)
            .await
            .map_err(|_| DenyReason::DatabaseValidationError)?
            .ok_or(DenyReason::ProfileNotFound)?;
        if profile.pause_status_profile {
            return Err(DenyReason::ProfilePaused);
        }

        // Step 4: load Family.
        let family = self
            .families
            .get(&family_id)
            .await
            .map_err(|_| DenyReason::DatabaseValidationError)?
            .ok_or(DenyReason::FamilyNotFound)?;
        if family.pause_status_family {
            return Err(DenyReason::FamilyPaused);
        }
        if family.token_balance <= 0 {
            return Err(DenyReason::InsufficientBalance);
        }

        // Step 5: allow, carrying every verified attribute.
        Ok(Identity {
            user_id,
            family_id,
            profile_id,
            role: claims.role.unwrap_or_else(|| profile.role.clone()),
            home_region: region,
            is_authenticated: true,
        })
    }
}
