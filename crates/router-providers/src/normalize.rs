use router_core::ErrorCode;

/// Upstream status/body → canonical `(ErrorCode, retryable)` (spec.md §4.2
/// "Error normalization table", verbatim).
#[must_use]
pub fn classify_http_status(status: u16, body: &str) -> (ErrorCode, bool) {
    match status {
        401 | 403 => (ErrorCode::Auth, false),
        404 => (ErrorCode::Capability, false),
        429 => (ErrorCode::RateLimit, true),
        400 if looks_like_content_moderation(body) => (ErrorCode::Content, false),
        400 => (ErrorCode::Capability, false),
        409 | 422 => (ErrorCode::Content, false),
        500..=599 => (ErrorCode::Timeout, true),
        other => (ErrorCode::Unknown, other >= 500),
    }
}

/// Connection failures and local deadlines both normalize to `TIMEOUT`,
/// retryable (spec.md §4.2).
#[must_use]
pub const fn classify_transport_failure() -> (ErrorCode, bool) {
    (ErrorCode::Timeout, true)
}

/// Heuristic for the 400-vs-400 split the table draws between a plain
/// invalid request and a moderation/content rejection; providers surface
/// this in the error body, not the status code.
fn looks_like_content_moderation(body: &str) -> bool {
    let lowered = body.to_ascii_lowercase();
    ["moderation", "content_policy", "content_filter", "safety"]
        .iter()
        .any(|needle| lowered.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_statuses_map_to_auth_not_retryable() {
        for status in [401, 403] {
            let (code, retryable) = classify_http_status(status, "");
            assert_eq!(code, ErrorCode::Auth);
            assert!(!retryable);
        }
    }

    #[test]
    fn rate_limit_is_retryable() {
        let (code, retryable) = classify_http_status(429, "");
        assert_eq!(code, ErrorCode::RateLimit);
        assert!(retryable);
    }

    #[test]
    fn plain_400_is_capability_moderated_400_is_content() {
        let (code, _) = classify_http_status(400, "missing required field 'model'");
        assert_eq!(code, ErrorCode::Capability);

        let (code, _) = classify_http_status(400, "Request blocked by content_policy");
        assert_eq!(code, ErrorCode::Content);
    }

    #[test]
    fn server_errors_map_to_timeout_retryable() {
        let (code, retryable) = classify_http_status(503, "");
        assert_eq!(code, ErrorCode::Timeout);
        assert!(retryable);
    }

    #[test]
    fn unmapped_client_status_is_unknown_not_retryable() {
        let (code, retryable) = classify_http_status(418, "");
        assert_eq!(code, ErrorCode::Unknown);
        assert!(!retryable);
    }
}
