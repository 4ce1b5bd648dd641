use serde::{Deserialize, Serialize};

/// Verified, request-scoped identity produced by the Admission Authorizer
///
/// The Router and everything downstream of admission treats this as the
/// sole source of truth for who is making the request (spec.md §4.1 step 5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub family_id: FamilyId,
    pub profile_id: ProfileId,
    pub role: String,
    pub home_region: String,
    pub is_authenticated: bool,
}

/// A region-prefixed family identifier: `"FAMILY#<region>#<logicalId>"`
///
/// Carries the composite partition key form described in spec.md §6 so call
/// sites never hand-format it twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FamilyId(String);

impl FamilyId {
    #[must_use]
    pub fn new(region: &str, logical_id: &str) -> Self {
        Self(format!("FAMILY#{region}#{logical_id}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The region embedded in the composite key, if well-formed
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.0.strip_prefix("FAMILY#")?.split('#').next()
    }
}

impl std::fmt::Display for FamilyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A region-prefixed profile identifier: `"PROFILE#<region>#<logicalId>"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileId(String);

impl ProfileId {
    #[must_use]
    pub fn new(region: &str, logical_id: &str) -> Self {
        Self(format!("PROFILE#{region}#{logical_id}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.0.strip_prefix("PROFILE#")?.split('#').next()
    }
}

impl std::fmt::Display for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Family row, read during admission only (spec.md §3)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Family {
    pub family_id: FamilyId,
    /// Signed integer balance; debited best-effort by the Router after a
    /// successful completion (spec.md §4.4 step 4c)
    pub token_balance: i64,
    pub pause_status_family: bool,
    pub primary_region: String,
}

impl Family {
    /// Admission invariant from spec.md §3: `pauseStatusFamily == false ∧ tokenBalance > 0`
    #[must_use]
    pub const fn admission_ok(&self) -> bool {
        !self.pause_status_family && self.token_balance > 0
    }
}

/// Profile row, read during admission only (spec.md §3)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub profile_id: ProfileId,
    pub family_id: FamilyId,
    pub role: String,
    pub pause_status_profile: bool,
    pub user_region: String,
}

impl Profile {
    #[must_use]
    pub const fn admission_ok(&self) -> bool {
        !self.pause_status_profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_id_round_trips_region() {
        let id = FamilyId::new("us-east-1", "fam-123");
        assert_eq!(id.as_str(), "FAMILY#us-east-1#fam-123");
        assert_eq!(id.region(), Some("us-east-1"));
    }

    #[test]
    fn family_admission_requires_positive_balance_and_no_pause() {
        let mut family = Family {
            family_id: FamilyId::new("us-east-1", "fam-123"),
            token_balance: 100,
            pause_status_family: false,
            primary_region: "us-east-1".to_owned(),
        };
        assert!(family.admission_ok());

        family.token_balance = 0;
        assert!(!family.admission_ok());

        family.token_balance = 100;
        family.pause_status_family = true;
        assert!(!family.admission_ok());
    }
}
