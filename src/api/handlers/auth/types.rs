//! Request/response types for auth endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::password::Violation;
use crate::session::RefreshTokenRecord;
use crate::users::UserRecord;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PasswordStrengthRequest {
    pub password: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct PasswordStrengthResponse {
    pub score: u8,
    pub violations: Vec<String>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&UserRecord> for UserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            roles: user.authorities(),
            last_login_at: user.last_login_at,
        }
    }
}

#[derive(ToSchema, Serialize, Debug)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct SessionInfo {
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl From<&RefreshTokenRecord> for SessionInfo {
    fn from(record: &RefreshTokenRecord) -> Self {
        Self {
            created_at: record.created_at,
            expires_at: record.expires_at,
            ip_address: record.ip_address.clone(),
            user_agent: record.user_agent.clone(),
        }
    }
}

/// Structured error body for responses that carry detail beyond a message,
/// such as the full violation list on a weak password.
#[derive(ToSchema, Serialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorResponse {
    pub(crate) fn weak_password(violations: &[Violation]) -> Self {
        Self {
            error: "weak_password".to_string(),
            message: "Password does not meet the policy".to_string(),
            details: Some(
                violations
                    .iter()
                    .map(|violation| violation.message().to_string())
                    .collect(),
            ),
        }
    }
}
