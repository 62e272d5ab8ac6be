//! Password change and strength-check endpoints.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::{
    principal::require_auth,
    state::AuthState,
    types::{ChangePasswordRequest, ErrorResponse, PasswordStrengthRequest, PasswordStrengthResponse},
};
use crate::password;
use crate::users::{self, store::find_by_id, store::update_password};

#[utoipa::path(
    post,
    path = "/v1/auth/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = String),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = String)
    ),
    tag = "auth"
)]
pub async fn change_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ChangePasswordRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &auth_state) {
        Ok(principal) => principal,
        Err((status, message)) => return (status, message).into_response(),
    };

    let request: ChangePasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let user = match find_by_id(&pool, principal.user_id).await {
        Ok(Some(user)) if user.is_active => user,
        Ok(_) => return (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()).into_response(),
        Err(err) => {
            error!("Password change lookup failed: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Password change failed".to_string(),
            )
                .into_response();
        }
    };

    if !users::verify_password(&request.current_password, &user.password_hash) {
        return (
            StatusCode::BAD_REQUEST,
            "Current password is incorrect".to_string(),
        )
            .into_response();
    }

    let violations = password::validate(&request.new_password);
    if !violations.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::weak_password(&violations)),
        )
            .into_response();
    }

    let password_hash = match users::hash_password(&request.new_password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Password change failed".to_string(),
            )
                .into_response();
        }
    };

    match update_password(&pool, user.id, &password_hash).await {
        Ok(()) => (StatusCode::OK, "Password updated".to_string()).into_response(),
        Err(err) => {
            error!("Failed to update password: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Password change failed".to_string(),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/password/strength",
    request_body = PasswordStrengthRequest,
    responses(
        (status = 200, description = "Strength estimate", body = PasswordStrengthResponse),
        (status = 400, description = "Missing payload", body = String)
    ),
    tag = "auth"
)]
pub async fn strength(payload: Option<Json<PasswordStrengthRequest>>) -> impl IntoResponse {
    let request: PasswordStrengthRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let violations = password::validate(&request.password);
    let response = PasswordStrengthResponse {
        score: password::strength_score(&request.password),
        violations: violations
            .iter()
            .map(|violation| violation.message().to_string())
            .collect(),
    };

    (StatusCode::OK, Json(response)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::test_support::{auth_state, unreachable_pool};
    use anyhow::Result;
    use axum::http::{header::AUTHORIZATION, HeaderValue};
    use uuid::Uuid;

    #[tokio::test]
    async fn change_password_requires_authentication() -> Result<()> {
        let response = change_password(
            HeaderMap::new(),
            Extension(unreachable_pool()?),
            Extension(auth_state()?),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn change_password_missing_payload() -> Result<()> {
        let state = auth_state()?;
        let token = state.signer().issue_access_token(
            "alice@example.com",
            Uuid::new_v4(),
            vec!["ROLE_USER".to_string()],
        )?;
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);

        let response = change_password(
            headers,
            Extension(unreachable_pool()?),
            Extension(state),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn strength_reports_score_and_violations() -> Result<()> {
        let response = strength(Some(Json(PasswordStrengthRequest {
            password: "password123".to_string(),
        })))
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        assert!(value.get("score").is_some());
        let violations = value
            .get("violations")
            .and_then(serde_json::Value::as_array)
            .map(Vec::len)
            .unwrap_or_default();
        assert!(violations >= 3);
        Ok(())
    }

    #[tokio::test]
    async fn strength_missing_payload() -> Result<()> {
        let response = strength(None).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
