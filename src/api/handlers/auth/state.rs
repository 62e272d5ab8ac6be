//! Auth configuration and shared request state.

use crate::token::{TokenSigner, DEFAULT_ACCESS_TTL_SECONDS};

const DEFAULT_ISSUER: &str = "feria";
const DEFAULT_REFRESH_TOKEN_DAYS: i64 = crate::session::DEFAULT_REFRESH_TOKEN_DAYS;
const DEFAULT_MAX_ACTIVE_SESSIONS: i64 = crate::session::DEFAULT_MAX_ACTIVE_SESSIONS;
const DEFAULT_FRONTEND_BASE_URL: &str = "http://localhost:5173";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    issuer: String,
    access_token_ttl_seconds: i64,
    refresh_token_days: i64,
    max_active_sessions: i64,
    frontend_base_url: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            access_token_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_token_days: DEFAULT_REFRESH_TOKEN_DAYS,
            max_active_sessions: DEFAULT_MAX_ACTIVE_SESSIONS,
            frontend_base_url: DEFAULT_FRONTEND_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_access_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_token_days(mut self, days: i64) -> Self {
        self.refresh_token_days = days;
        self
    }

    #[must_use]
    pub fn with_max_active_sessions(mut self, sessions: i64) -> Self {
        self.max_active_sessions = sessions;
        self
    }

    #[must_use]
    pub fn with_frontend_base_url(mut self, url: String) -> Self {
        self.frontend_base_url = url;
        self
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_seconds
    }

    #[must_use]
    pub fn refresh_token_days(&self) -> i64 {
        self.refresh_token_days
    }

    #[must_use]
    pub fn max_active_sessions(&self) -> i64 {
        self.max_active_sessions
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-process auth state: configuration plus the signing keypair, both
/// loaded once at startup.
pub struct AuthState {
    config: AuthConfig,
    signer: TokenSigner,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, signer: TokenSigner) -> Self {
        Self { config, signer }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new();

        assert_eq!(config.issuer(), DEFAULT_ISSUER);
        assert_eq!(
            config.access_token_ttl_seconds(),
            DEFAULT_ACCESS_TTL_SECONDS
        );
        assert_eq!(config.refresh_token_days(), DEFAULT_REFRESH_TOKEN_DAYS);
        assert_eq!(config.max_active_sessions(), DEFAULT_MAX_ACTIVE_SESSIONS);
        assert_eq!(config.frontend_base_url(), DEFAULT_FRONTEND_BASE_URL);

        let config = config
            .with_issuer("https://api.feria.test".to_string())
            .with_access_token_ttl_seconds(60)
            .with_refresh_token_days(1)
            .with_max_active_sessions(2)
            .with_frontend_base_url("https://feria.test".to_string());

        assert_eq!(config.issuer(), "https://api.feria.test");
        assert_eq!(config.access_token_ttl_seconds(), 60);
        assert_eq!(config.refresh_token_days(), 1);
        assert_eq!(config.max_active_sessions(), 2);
        assert_eq!(config.frontend_base_url(), "https://feria.test");
    }
}
