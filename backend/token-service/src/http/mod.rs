/// HTTP API for collaborator services
///
/// The digest builder calls the internal issue endpoint to embed
/// links in outgoing email; the preference and unsubscribe APIs call
/// the validate endpoint before touching any subscriber state, and
/// the revoke endpoints when links must stop working.
///
/// Security: issue/revoke endpoints require INTERNAL_API_KEY
/// authentication via the X-Internal-API-Key header. Validation is
/// open: it authenticates by the token itself.
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::TokenError;
use crate::models::TokenPurpose;
use crate::security::DeviceContext;
use crate::services::{RevocationManager, TokenIssuer, TokenValidator};

/// Shared HTTP server state: the service objects constructed once at
/// process start. No ambient global token manager.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<TokenIssuer>,
    pub validator: Arc<TokenValidator>,
    pub revocation: Arc<RevocationManager>,
    pub internal_api_key: Option<String>,
}

/// Build the HTTP router with all endpoints
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/tokens/validate", post(validate_token))
        .route("/internal/tokens", post(issue_token))
        .route("/internal/tokens/{token_id}/revoke", post(revoke_token))
        .route(
            "/internal/subjects/{subject_id}/revoke",
            post(revoke_subject),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            internal_auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint (no auth required)
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Authentication middleware for /internal/* routes - validates the
/// X-Internal-API-Key header
async fn internal_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !request.uri().path().starts_with("/internal/") {
        return next.run(request).await;
    }

    let Some(expected_key) = &state.internal_api_key else {
        warn!("Internal API key not configured - blocking all internal requests");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal API key not configured",
        )
            .into_response();
    };

    let provided_key = request
        .headers()
        .get("x-internal-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if provided_key != expected_key {
        warn!(
            path = %request.uri().path(),
            "Unauthorized internal API request - invalid API key"
        );
        return (StatusCode::UNAUTHORIZED, "Invalid API key").into_response();
    }

    next.run(request).await
}

#[derive(Debug, Deserialize)]
pub struct IssueTokenRequest {
    pub subject_id: Uuid,
    pub purpose: TokenPurpose,
    /// Browser context of the requesting end user, forwarded by the
    /// collaborator when the token is minted during a live session.
    /// Absent for tokens embedded in outgoing email.
    pub user_agent: Option<String>,
    pub network_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IssueTokenResponse {
    pub token: String,
    pub token_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub max_usage: i32,
}

async fn issue_token(
    State(state): State<AppState>,
    Json(req): Json<IssueTokenRequest>,
) -> Result<impl IntoResponse, TokenError> {
    let device = device_context(req.user_agent, req.network_address);
    let issued = state
        .issuer
        .issue(req.subject_id, req.purpose, device.as_ref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(IssueTokenResponse {
            token: issued.token,
            token_id: issued.record.id,
            expires_at: issued.record.expires_at,
            max_usage: issued.record.max_usage,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ValidateTokenRequest {
    pub token: String,
    pub purpose: TokenPurpose,
    /// End-user browser context, forwarded by the calling API for the
    /// soft device check.
    pub user_agent: Option<String>,
    pub network_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidateTokenResponse {
    pub subject_id: Uuid,
}

async fn validate_token(
    State(state): State<AppState>,
    Json(req): Json<ValidateTokenRequest>,
) -> Result<Json<ValidateTokenResponse>, TokenError> {
    let device = device_context(req.user_agent, req.network_address);
    let subject_id = state
        .validator
        .validate(&req.token, req.purpose, device.as_ref())
        .await?;

    Ok(Json(ValidateTokenResponse { subject_id }))
}

async fn revoke_token(
    State(state): State<AppState>,
    Path(token_id): Path<Uuid>,
) -> Result<StatusCode, TokenError> {
    state.revocation.revoke_token(token_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct RevokeSubjectResponse {
    pub revoked: u64,
}

async fn revoke_subject(
    State(state): State<AppState>,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<RevokeSubjectResponse>, TokenError> {
    let revoked = state.revocation.revoke_all_for_subject(subject_id).await?;
    Ok(Json(RevokeSubjectResponse { revoked }))
}

fn device_context(
    user_agent: Option<String>,
    network_address: Option<String>,
) -> Option<DeviceContext> {
    match (user_agent, network_address) {
        (Some(user_agent), Some(network_address)) => Some(DeviceContext {
            user_agent,
            network_address,
        }),
        _ => None,
    }
}

/// Start the HTTP server
pub async fn start_http_server(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Starting token service HTTP API on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryAuditSink, MemoryTokenStore};
    use crate::security::TokenCodec;
    use crate::services::SecurityAuditLog;
    use tower::ServiceExt;

    fn test_state(internal_api_key: Option<String>) -> AppState {
        let store = Arc::new(MemoryTokenStore::new());
        let audit = Arc::new(SecurityAuditLog::new(Arc::new(MemoryAuditSink::new())));
        let codec = Arc::new(TokenCodec::new("router-test-secret-0123456789abcd"));

        AppState {
            issuer: Arc::new(TokenIssuer::new(
                store.clone(),
                codec.clone(),
                audit.clone(),
            )),
            validator: Arc::new(TokenValidator::new(store.clone(), codec, audit.clone())),
            revocation: Arc::new(RevocationManager::new(store, audit)),
            internal_api_key,
        }
    }

    fn json_request(uri: &str, body: &str, api_key: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(key) = api_key {
            builder = builder.header("x-internal-api-key", key);
        }
        builder
            .body(axum::body::Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_is_open() {
        let app = build_router(test_state(None));
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_internal_routes_require_api_key() {
        let app = build_router(test_state(Some("sekrit".into())));
        let body = r#"{"subject_id":"6e1cda6a-5a5a-4f43-a54d-47b1c2f0a2a5","purpose":"unsubscribe"}"#;

        let response = app
            .oneshot(json_request("/internal/tokens", body, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_internal_routes_refuse_without_configured_key() {
        let app = build_router(test_state(None));
        let body = r#"{"subject_id":"6e1cda6a-5a5a-4f43-a54d-47b1c2f0a2a5","purpose":"unsubscribe"}"#;

        let response = app
            .oneshot(json_request("/internal/tokens", body, Some("anything")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_issue_and_validate_through_router() {
        let app = build_router(test_state(Some("sekrit".into())));
        let body = r#"{"subject_id":"6e1cda6a-5a5a-4f43-a54d-47b1c2f0a2a5","purpose":"unsubscribe"}"#;

        let response = app
            .clone()
            .oneshot(json_request("/internal/tokens", body, Some("sekrit")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_malformed_token_maps_to_bad_request() {
        let app = build_router(test_state(None));
        let body = r#"{"token":"not-a-token","purpose":"unsubscribe"}"#;

        let response = app
            .oneshot(json_request("/tokens/validate", body, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
