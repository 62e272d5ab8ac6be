//! Logout endpoints: single session and everything at once.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::{principal::require_auth, state::AuthState, types::LogoutRequest};
use crate::session::store;

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Session cleared", body = String)
    ),
    tag = "auth"
)]
pub async fn logout(
    pool: Extension<PgPool>,
    payload: Option<Json<LogoutRequest>>,
) -> impl IntoResponse {
    // Idempotent: unknown, expired, or already-revoked tokens all get the
    // same 200. Reuse of a rotated token still trips the theft response
    // inside validate before the error is swallowed here.
    if let Some(Json(request)) = payload {
        match store::validate(&pool, &request.refresh_token).await {
            Ok(record) => {
                if let Err(err) = store::revoke(&pool, &record.token).await {
                    error!("Failed to revoke refresh token: {err}");
                }
            }
            Err(err) => {
                tracing::debug!("Logout with non-active refresh token: {err}");
            }
        }
    }

    (StatusCode::OK, "Logged out".to_string())
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout-all",
    responses(
        (status = 200, description = "All sessions revoked", body = String),
        (status = 401, description = "Unauthorized", body = String)
    ),
    tag = "auth"
)]
pub async fn logout_all(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &auth_state) {
        Ok(principal) => principal,
        Err((status, message)) => return (status, message).into_response(),
    };

    match store::revoke_all(&pool, principal.user_id).await {
        Ok(revoked) => (StatusCode::OK, Json(json!({ "revoked": revoked }))).into_response(),
        Err(err) => {
            error!("Failed to revoke sessions: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Logout failed".to_string(),
            )
                .into_response()
        }
    }
}
