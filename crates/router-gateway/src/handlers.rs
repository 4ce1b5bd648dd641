use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::{HeaderMap, StatusCode};
use router_auth::{AdmissionAuthorizer, DenyReason};
use router_config::ConfigStore;
use router_core::{ChatError, ChatRequest, ErrorCode, HttpError, RequestMeta};
use router_health::ProviderHealthStore;
use router_routing::SnapshotSource;

/// Generic over the snapshot source so tests can substitute a fixed snapshot
/// instead of a file-backed `ConfigStore` (default for the production binary).
pub type Router<C = ConfigStore> = router_routing::ModelRouter<Arc<dyn ProviderHealthStore>, C>;

/// Shared handler state: the Admission Authorizer and the assembled Router.
pub struct AppState<C = ConfigStore> {
    pub authorizer: Arc<AdmissionAuthorizer>,
    pub router: Arc<Router<C>>,
}

/// `POST /v1/chat` (spec.md §6): authenticate, route, respond.
///
/// Request/response bodies are never logged (router-telemetry's contract).
pub async fn chat_handler<C: SnapshotSource + 'static>(
    State(state): State<Arc<AppState<C>>>,
    headers: HeaderMap,
    Json(mut request): Json<ChatRequest>,
) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return error_envelope(StatusCode::UNAUTHORIZED, ErrorCode::Auth, "missing bearer token", None);
    };

    let identity = match state.authorizer.authorize(token, "chat").await {
        Ok(identity) => identity,
        Err(deny) => return deny_response(&deny),
    };

    request.meta = Some(RequestMeta {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
        user_id: identity.user_id.clone(),
        family_id: identity.family_id.clone(),
        profile_id: identity.profile_id.clone(),
        user_home_region: identity.home_region.clone(),
    });

    match state.router.route(&request, &identity).await {
        Ok(success) => success_response(&success),
        Err(err) => chat_error_response(&err),
    }
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Wraps a successful completion in the wire envelope (spec.md §6):
/// `{"success": true, "data": <ChatSuccess>}`.
fn success_response(success: &router_core::ChatSuccess) -> Response {
    let body = serde_json::json!({
        "success": true,
        "data": success,
    });
    (StatusCode::OK, Json(body)).into_response()
}

/// Builds the wire error envelope (spec.md §6):
/// `{"success": false, "message": string, "error": {"code": <taxonomy>, "details"?: any}}`.
fn error_envelope(status: StatusCode, code: ErrorCode, message: &str, details: Option<&str>) -> Response {
    let body = serde_json::json!({
        "success": false,
        "message": message,
        "error": {
            "code": code,
            "details": details,
        }
    });
    (status, Json(body)).into_response()
}

fn chat_error_response(err: &ChatError) -> Response {
    error_envelope(err.status_code(), err.code, &err.client_message(), err.detail.as_deref())
}

/// Admission denials carry no `ErrorCode` of their own; every variant maps to
/// `AUTH` (spec.md §6's status-bucket legend groups every 401/403 admission
/// case under "auth"), except the one store-fault variant, which is an
/// internal error rather than a caller-facing auth failure.
fn deny_response(deny: &DenyReason) -> Response {
    let code = if matches!(deny, DenyReason::DatabaseValidationError) {
        ErrorCode::InternalError
    } else {
        ErrorCode::Auth
    };
    error_envelope(deny.status_code(), code, &deny.client_message(), None)
}
