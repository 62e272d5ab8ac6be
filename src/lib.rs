//! # Feria (Accounts & Token Authority)
//!
//! `feria` is the account and authentication service for a livestock
//! marketplace. It handles registration, password-based login, and
//! session management backed by rotating refresh tokens.
//!
//! ## Tokens
//!
//! Access tokens are RS256-signed JWTs carrying the holder's roles. They
//! are short-lived and verified offline; the signing key is published as a
//! JWKS under `/.well-known/jwks.json`.
//!
//! Refresh tokens are opaque, single-use values stored server side. Each
//! refresh rotates the token and links the old record to its replacement,
//! so presenting an already-rotated token is detected as reuse and revokes
//! every session of the account.
//!
//! ## Passwords
//!
//! Passwords are hashed with Argon2id and validated against a composition
//! policy before any hashing takes place. Login failures do not reveal
//! whether the email exists.

pub mod api;
pub mod cli;
pub mod password;
pub mod session;
pub mod token;
pub mod users;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        // Should be a hex string (full SHA-1 is 40 chars, but could be short)
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
