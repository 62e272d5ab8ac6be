//! OpenAPI document for the HTTP surface.

use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;

use super::handlers::{auth, health, jwks};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "feria",
        description = "User accounts and token-based authentication",
    ),
    paths(
        health::health,
        jwks::jwks,
        auth::register::register,
        auth::login::login,
        auth::refresh::refresh,
        auth::logout::logout,
        auth::logout::logout_all,
        auth::password::change_password,
        auth::password::strength,
        auth::sessions::list_sessions,
        auth::sessions::admin_revoke_sessions,
    ),
    components(schemas(
        auth::types::RegisterRequest,
        auth::types::LoginRequest,
        auth::types::RefreshRequest,
        auth::types::LogoutRequest,
        auth::types::ChangePasswordRequest,
        auth::types::PasswordStrengthRequest,
        auth::types::PasswordStrengthResponse,
        auth::types::AuthResponse,
        auth::types::UserResponse,
        auth::types::SessionInfo,
        auth::types::ErrorResponse,
        crate::password::Violation,
        crate::token::jwks::Jwks,
        crate::token::jwks::Jwk,
    ))
)]
pub struct ApiDoc;

/// Serve the machine-readable API document.
pub async fn openapi() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_auth_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for expected in [
            "/health",
            "/.well-known/jwks.json",
            "/v1/auth/register",
            "/v1/auth/login",
            "/v1/auth/refresh",
            "/v1/auth/logout",
            "/v1/auth/logout-all",
            "/v1/auth/password",
            "/v1/auth/password/strength",
            "/v1/auth/sessions",
            "/v1/auth/admin/users/{user_id}/revoke-sessions",
        ] {
            assert!(
                paths.iter().any(|path| path.as_str() == expected),
                "missing path: {expected}"
            );
        }
    }
}
