//! Refresh-token sessions and the rotation protocol.
//!
//! A refresh token is a single-use credential: using it to mint a new access
//! token rotates it, revoking the old row and linking it to its replacement.
//! Presenting an already-rotated token is treated as theft evidence and wipes
//! every active session for that user.
//!
//! The state classification lives here as pure functions so the protocol can
//! be tested without a database; the SQL lives in [`store`].

use anyhow::{Context, Result};
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use uuid::Uuid;

pub mod purge;
pub mod store;

pub const DEFAULT_REFRESH_TOKEN_DAYS: i64 = 7;
pub const DEFAULT_MAX_ACTIVE_SESSIONS: i64 = 5;

/// One persisted refresh token.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub replaced_by_token: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Lifecycle state of a refresh token. `Rotated`, `Revoked`, and `Expired`
/// are terminal; rows only leave them by physical purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Active,
    Rotated,
    Revoked,
    Expired,
}

impl RefreshTokenRecord {
    /// Classify this row at `now`.
    ///
    /// A replacement link outranks everything else: rotation sets both
    /// `revoked_at` and `replaced_by_token`, and collapsing that case into
    /// plain revocation would hide reuse of a rotated token.
    #[must_use]
    pub fn status(&self, now: DateTime<Utc>) -> TokenStatus {
        if self.replaced_by_token.is_some() {
            TokenStatus::Rotated
        } else if self.revoked_at.is_some() {
            TokenStatus::Revoked
        } else if self.expires_at <= now {
            TokenStatus::Expired
        } else {
            TokenStatus::Active
        }
    }

    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status(now) == TokenStatus::Active
    }
}

/// Why a presented refresh token was not accepted.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("refresh token is not recognized")]
    Unknown,
    #[error("refresh token has been revoked")]
    Revoked,
    #[error("refresh token has expired")]
    Expired,
    #[error("refresh token reuse detected")]
    Compromised,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Pure validation verdict for a looked-up row.
///
/// `Compromised` means the caller must revoke every active session for the
/// row's user before surfacing the error.
///
/// # Errors
///
/// Returns the [`ValidateError`] matching the row's state; `Ok` only for an
/// active row.
pub fn evaluate(
    record: Option<&RefreshTokenRecord>,
    now: DateTime<Utc>,
) -> Result<(), ValidateError> {
    let Some(record) = record else {
        return Err(ValidateError::Unknown);
    };
    match record.status(now) {
        TokenStatus::Active => Ok(()),
        TokenStatus::Rotated => Err(ValidateError::Compromised),
        TokenStatus::Revoked => Err(ValidateError::Revoked),
        TokenStatus::Expired => Err(ValidateError::Expired),
    }
}

/// Client metadata recorded alongside each refresh token.
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientContext {
    /// Extract client IP and user agent from request headers.
    #[must_use]
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        Self {
            ip_address: extract_client_ip(headers),
            user_agent: headers
                .get(axum::http::header::USER_AGENT)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
        }
    }
}

/// Extract a client IP from common proxy headers.
fn extract_client_ip(headers: &axum::http::HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Create a new opaque refresh token value: 32 random bytes, base64url.
///
/// # Errors
///
/// Returns an error if the system RNG fails.
pub fn generate_refresh_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate refresh token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}
