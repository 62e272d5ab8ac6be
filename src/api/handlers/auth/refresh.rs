//! Refresh-token rotation endpoint.

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
    login::build_auth_response,
    state::AuthState,
    types::{AuthResponse, RefreshRequest},
};
use crate::session::{store, ClientContext, ValidateError};
use crate::users::store::find_by_id;

#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair issued", body = AuthResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 401, description = "Refresh token rejected", body = String)
    ),
    tag = "auth"
)]
pub async fn refresh(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RefreshRequest>>,
) -> impl IntoResponse {
    let request: RefreshRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    // validate handles the theft response itself: a rotated token presented
    // again wipes every active session before this returns.
    let record = match store::validate(&pool, &request.refresh_token).await {
        Ok(record) => record,
        Err(err) => return validate_error_response(&err).into_response(),
    };

    let user = match find_by_id(&pool, record.user_id).await {
        Ok(Some(user)) if user.is_active => user,
        Ok(_) => {
            return (
                StatusCode::UNAUTHORIZED,
                "Invalid refresh token".to_string(),
            )
                .into_response()
        }
        Err(err) => {
            error!("Refresh lookup failed: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Refresh failed".to_string(),
            )
                .into_response();
        }
    };

    let client = ClientContext::from_headers(&headers);
    let new_record = match store::rotate(
        &pool,
        &record.token,
        user.id,
        &client,
        auth_state.config().refresh_token_days(),
    )
    .await
    {
        Ok(record) => record,
        // A concurrent request can revoke or rotate the token between
        // validate and here; rotate reports that as Revoked.
        Err(err) => return validate_error_response(&err).into_response(),
    };

    match build_auth_response(&auth_state, &user, &new_record) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err((status, message)) => (status, message).into_response(),
    }
}

fn validate_error_response(err: &ValidateError) -> (StatusCode, String) {
    match err {
        ValidateError::Unknown => (
            StatusCode::UNAUTHORIZED,
            "Invalid refresh token".to_string(),
        ),
        ValidateError::Revoked => (
            StatusCode::UNAUTHORIZED,
            "Refresh token has been revoked".to_string(),
        ),
        ValidateError::Expired => (
            StatusCode::UNAUTHORIZED,
            "Refresh token has expired".to_string(),
        ),
        ValidateError::Compromised => (
            StatusCode::UNAUTHORIZED,
            "Refresh token reuse detected; all sessions revoked".to_string(),
        ),
        ValidateError::Storage(err) => {
            error!("Refresh validation failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Refresh failed".to_string(),
            )
        }
    }
}
