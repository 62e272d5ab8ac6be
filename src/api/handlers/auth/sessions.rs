//! Session listing and administrative revocation.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use super::{principal::require_auth, state::AuthState, types::SessionInfo};
use crate::session::store;
use crate::users::UserRole;

#[utoipa::path(
    get,
    path = "/v1/auth/sessions",
    responses(
        (status = 200, description = "Active sessions", body = [SessionInfo]),
        (status = 401, description = "Unauthorized", body = String)
    ),
    tag = "auth"
)]
pub async fn list_sessions(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &auth_state) {
        Ok(principal) => principal,
        Err((status, message)) => return (status, message).into_response(),
    };

    match store::list_active(&pool, principal.user_id).await {
        Ok(records) => {
            let sessions: Vec<SessionInfo> = records.iter().map(SessionInfo::from).collect();
            (StatusCode::OK, Json(sessions)).into_response()
        }
        Err(err) => {
            error!("Failed to list sessions: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list sessions".to_string(),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/admin/users/{user_id}/revoke-sessions",
    params(
        ("user_id" = Uuid, Path, description = "Target user")
    ),
    responses(
        (status = 200, description = "Sessions revoked", body = String),
        (status = 401, description = "Unauthorized", body = String),
        (status = 403, description = "Access denied", body = String)
    ),
    tag = "admin"
)]
pub async fn admin_revoke_sessions(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(user_id): Path<Uuid>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &auth_state) {
        Ok(principal) => principal,
        Err((status, message)) => return (status, message).into_response(),
    };

    if let Err((status, message)) = principal.require_role(UserRole::Admin) {
        return (status, message).into_response();
    }

    match store::revoke_all(&pool, user_id).await {
        Ok(revoked) => {
            info!(admin = %principal.user_id, target = %user_id, revoked, "Admin revoked sessions");
            (StatusCode::OK, Json(json!({ "revoked": revoked }))).into_response()
        }
        Err(err) => {
            error!("Failed to revoke sessions: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to revoke sessions".to_string(),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::test_support::{auth_state, bearer_for, unreachable_pool};
    use anyhow::Result;

    #[tokio::test]
    async fn list_sessions_requires_authentication() -> Result<()> {
        let response = list_sessions(
            HeaderMap::new(),
            Extension(unreachable_pool()?),
            Extension(auth_state()?),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn admin_revoke_rejects_non_admins() -> Result<()> {
        let state = auth_state()?;
        let headers = bearer_for(&state, "buyer@example.com", &["ROLE_BUYER"])?;

        let response = admin_revoke_sessions(
            headers,
            Extension(unreachable_pool()?),
            Extension(state),
            Path(Uuid::new_v4()),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        Ok(())
    }

    #[tokio::test]
    async fn admin_revoke_requires_authentication() -> Result<()> {
        let response = admin_revoke_sessions(
            HeaderMap::new(),
            Extension(unreachable_pool()?),
            Extension(auth_state()?),
            Path(Uuid::new_v4()),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }
}
