//! Account registration endpoint.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use tracing::{error, info};

use super::{
    types::{ErrorResponse, RegisterRequest, UserResponse},
    utils::{normalize_email, valid_email},
};
use crate::password;
use crate::users::{self, store::insert_user, store::SignupOutcome, UserRole};

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = String)
    ),
    tag = "auth"
)]
pub async fn register(
    pool: Extension<PgPool>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    // Policy runs on the plaintext; only accepted passwords are ever hashed.
    let violations = password::validate(&request.password);
    if !violations.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::weak_password(&violations)),
        )
            .into_response();
    }

    let password_hash = match users::hash_password(&request.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Registration failed".to_string(),
            )
                .into_response();
        }
    };

    match insert_user(&pool, &email, &password_hash, &[UserRole::User]).await {
        Ok(SignupOutcome::Created(user)) => {
            info!(user_id = %user.id, "Account created");
            (StatusCode::CREATED, Json(UserResponse::from(&user))).into_response()
        }
        Ok(SignupOutcome::Conflict) => (
            StatusCode::CONFLICT,
            "Email already registered".to_string(),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to insert user: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Registration failed".to_string(),
            )
                .into_response()
        }
    }
}
