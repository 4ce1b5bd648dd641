use router_core::HttpError;

/// Admission denial reasons (spec.md §4.1)
///
/// The Authorizer never retries; every variant here is a terminal decision
/// surfaced to the caller as-is, with no router fallback attempted.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DenyReason {
    #[error("unauthorized")]
    Unauthorized,
    #[error("incomplete identity")]
    IncompleteIdentity,
    #[error("profile not found")]
    ProfileNotFound,
    #[error("profile paused")]
    ProfilePaused,
    #[error("family not found")]
    FamilyNotFound,
    #[error("family paused")]
    FamilyPaused,
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("database validation error")]
    DatabaseValidationError,
}

impl HttpError for DenyReason {
    fn status_code(&self) -> http::StatusCode {
        match self {
            Self::Unauthorized | Self::IncompleteIdentity => http::StatusCode::UNAUTHORIZED,
            Self::ProfileNotFound
            | Self::ProfilePaused
            | Self::FamilyNotFound
            | Self::FamilyPaused
            | Self::InsufficientBalance => http::StatusCode::FORBIDDEN,
            Self::DatabaseValidationError => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::IncompleteIdentity => "incomplete_identity",
            Self::ProfileNotFound => "profile_not_found",
            Self::ProfilePaused => "profile_paused",
            Self::FamilyNotFound => "family_not_found",
            Self::FamilyPaused => "family_paused",
            Self::InsufficientBalance => "insufficient_balance",
            Self::DatabaseValidationError => "database_validation_error",
        }
    }

    fn client_message(&self) -> String {
        self.to_string()
    }
}
