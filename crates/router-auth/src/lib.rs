mod authorizer;
mod error;
mod family_store;
mod profile_store;
mod verifier;

pub use authorizer::AdmissionAuthorizer;
pub use error::DenyReason;
pub use family_store::{FamilyStore, FamilyStoreError, InMemoryFamilyStore, RedisFamilyStore};
pub use profile_store::{InMemoryProfileStore, ProfileStore, ProfileStoreError, RedisProfileStore};
pub use verifier::{IdentityClaims, IdentityVerifier, JwtIdentityVerifier};
