//! User records, roles, and password hashing.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString};
use argon2::{Argon2, PasswordVerifier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

pub mod store;

/// Closed role set. Unknown authority strings never become roles, so a typo in
/// stored data cannot mint a new access class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
    #[serde(rename = "ROLE_SELLER")]
    Seller,
    #[serde(rename = "ROLE_BUYER")]
    Buyer,
    #[serde(rename = "ROLE_MODERATOR")]
    Moderator,
    #[serde(rename = "ROLE_USER")]
    User,
}

impl UserRole {
    #[must_use]
    pub fn authority(&self) -> &'static str {
        match self {
            Self::Admin => "ROLE_ADMIN",
            Self::Seller => "ROLE_SELLER",
            Self::Buyer => "ROLE_BUYER",
            Self::Moderator => "ROLE_MODERATOR",
            Self::User => "ROLE_USER",
        }
    }

    #[must_use]
    pub fn from_authority(authority: &str) -> Option<Self> {
        match authority {
            "ROLE_ADMIN" => Some(Self::Admin),
            "ROLE_SELLER" => Some(Self::Seller),
            "ROLE_BUYER" => Some(Self::Buyer),
            "ROLE_MODERATOR" => Some(Self::Moderator),
            "ROLE_USER" => Some(Self::User),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<UserRole>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Role authorities as claim strings.
    #[must_use]
    pub fn authorities(&self) -> Vec<String> {
        self.roles
            .iter()
            .map(|role| role.authority().to_string())
            .collect()
    }
}

/// Map stored authority strings to roles, dropping anything unrecognized.
pub(crate) fn roles_from_authorities(authorities: &[String]) -> Vec<UserRole> {
    authorities
        .iter()
        .filter_map(|authority| {
            let role = UserRole::from_authority(authority);
            if role.is_none() {
                warn!("Ignoring unknown role authority: {authority}");
            }
            role
        })
        .collect()
}

/// A valid argon2id hash of no credential anyone holds. Verifying against it
/// keeps the unknown-email path doing the same work as the wrong-password
/// path.
const DUMMY_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$gZiV/M1gPc22ElAH/Jh1Hw$CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno";

/// Hash a password with argon2id and a fresh random salt.
///
/// # Errors
///
/// Returns an error if hashing fails.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow::anyhow!("failed to hash password: {err}"))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC hash string.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|hash| {
            Argon2::default()
                .verify_password(password.as_bytes(), &hash)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Burn the same verification work as a real mismatch, then fail.
#[must_use]
pub fn verify_against_dummy(password: &str) -> bool {
    let _ = verify_password(password, DUMMY_PASSWORD_HASH);
    false
}
