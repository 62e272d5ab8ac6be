//! Password login endpoint.

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
    state::AuthState,
    types::{AuthResponse, LoginRequest, UserResponse},
    utils::{normalize_email, valid_email},
};
use crate::session::{store, ClientContext, RefreshTokenRecord};
use crate::users::{self, store::find_by_email, UserRecord};

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = AuthResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 401, description = "Bad credentials", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    let user = match find_by_email(&pool, &email).await {
        Ok(user) => user,
        Err(err) => {
            error!("Login lookup failed: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Login failed".to_string(),
            )
                .into_response();
        }
    };

    // Unknown, inactive, and wrong-password all burn the same verification
    // work and return the same response.
    let user = match user {
        Some(user)
            if user.is_active && users::verify_password(&request.password, &user.password_hash) =>
        {
            user
        }
        _ => {
            let _ = users::verify_against_dummy(&request.password);
            return (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            )
                .into_response();
        }
    };

    if let Err(err) = users::store::update_last_login(&pool, user.id).await {
        error!("Failed to record last login: {err}");
    }

    let client = ClientContext::from_headers(&headers);
    let record = match store::create(
        &pool,
        user.id,
        &client,
        auth_state.config().refresh_token_days(),
        auth_state.config().max_active_sessions(),
    )
    .await
    {
        Ok(record) => record,
        Err(err) => {
            error!("Failed to create refresh token: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Login failed".to_string(),
            )
                .into_response();
        }
    };

    match build_auth_response(&auth_state, &user, &record) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err((status, message)) => (status, message).into_response(),
    }
}

/// Assemble the token pair response shared by login and refresh.
pub(super) fn build_auth_response(
    auth_state: &AuthState,
    user: &UserRecord,
    refresh_record: &RefreshTokenRecord,
) -> Result<AuthResponse, (StatusCode, String)> {
    let access_token = auth_state
        .signer()
        .issue_access_token(&user.email, user.id, user.authorities())
        .map_err(|err| {
            error!("Failed to sign access token: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication failed".to_string(),
            )
        })?;

    Ok(AuthResponse {
        access_token,
        refresh_token: refresh_record.token.clone(),
        token_type: "Bearer".to_string(),
        expires_in: auth_state.signer().access_ttl_seconds(),
        user: UserResponse::from(user),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::test_support::{auth_state, unreachable_pool};
    use anyhow::Result;

    #[tokio::test]
    async fn login_missing_payload() -> Result<()> {
        let response = login(
            HeaderMap::new(),
            Extension(unreachable_pool()?),
            Extension(auth_state()?),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn login_invalid_email() -> Result<()> {
        let response = login(
            HeaderMap::new(),
            Extension(unreachable_pool()?),
            Extension(auth_state()?),
            Some(Json(LoginRequest {
                email: "not-an-email".to_string(),
                password: "Passw0rd!".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn login_database_down_is_a_500() -> Result<()> {
        let response = login(
            HeaderMap::new(),
            Extension(unreachable_pool()?),
            Extension(auth_state()?),
            Some(Json(LoginRequest {
                email: "alice@example.com".to_string(),
                password: "Passw0rd!".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        Ok(())
    }

    #[test]
    fn auth_response_shape() -> Result<()> {
        use crate::session::RefreshTokenRecord;
        use crate::users::{UserRecord, UserRole};
        use chrono::{Duration, Utc};
        use uuid::Uuid;

        let state = auth_state()?;
        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            password_hash: String::new(),
            roles: vec![UserRole::Seller],
            is_active: true,
            created_at: now,
            last_login_at: None,
        };
        let record = RefreshTokenRecord {
            id: Uuid::new_v4(),
            token: "refresh-token".to_string(),
            user_id: user.id,
            expires_at: now + Duration::days(7),
            created_at: now,
            revoked_at: None,
            replaced_by_token: None,
            ip_address: None,
            user_agent: None,
        };

        let response = build_auth_response(&state, &user, &record)
            .map_err(|(_, message)| anyhow::anyhow!(message))?;
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.refresh_token, "refresh-token");
        assert_eq!(response.expires_in, state.signer().access_ttl_seconds());
        assert_eq!(response.user.roles, vec!["ROLE_SELLER"]);

        let claims = state.signer().verify(&response.access_token)?;
        assert_eq!(claims.user_id, user.id);
        Ok(())
    }
}
