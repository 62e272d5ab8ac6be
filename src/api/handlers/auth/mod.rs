//! Authentication orchestration: login, refresh rotation, logout, account
//! management, and the principal extraction the rest of the API uses.

pub mod login;
pub mod logout;
pub mod password;
pub mod principal;
pub mod refresh;
pub mod register;
pub mod sessions;
pub mod state;
pub mod types;

mod utils;

pub use principal::Principal;
pub use state::{AuthConfig, AuthState};

#[cfg(test)]
pub(crate) mod test_support {
    use super::state::{AuthConfig, AuthState};
    use crate::token::test_keys::TEST_PRIVATE_KEY_PEM;
    use crate::token::TokenSigner;
    use anyhow::Result;
    use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue};
    use sqlx::postgres::PgPoolOptions;
    use sqlx::PgPool;
    use std::sync::Arc;
    use std::time::Duration;

    pub(crate) fn auth_state() -> Result<Arc<AuthState>> {
        let config = AuthConfig::new().with_issuer("https://api.feria.test".to_string());
        let signer = TokenSigner::from_private_key_pem_or_der(
            TEST_PRIVATE_KEY_PEM.as_bytes(),
            config.issuer(),
            "k1",
            config.access_token_ttl_seconds(),
        )?;
        Ok(Arc::new(AuthState::new(config, signer)))
    }

    pub(crate) fn unreachable_pool() -> Result<PgPool> {
        Ok(PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(100))
            .connect_lazy("postgres://postgres@127.0.0.1:1/feria")?)
    }

    pub(crate) fn bearer_for(
        state: &AuthState,
        email: &str,
        authorities: &[&str],
    ) -> Result<HeaderMap> {
        let token = state.signer().issue_access_token(
            email,
            uuid::Uuid::new_v4(),
            authorities.iter().map(ToString::to_string).collect(),
        )?;
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))?,
        );
        Ok(headers)
    }
}
