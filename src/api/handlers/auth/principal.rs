//! Authenticated principal extraction from bearer access tokens.

use axum::http::{HeaderMap, StatusCode};
use uuid::Uuid;

use super::state::AuthState;
use super::utils::extract_bearer_token;
use crate::token::{self, TokenUse};
use crate::users::UserRole;

/// The verified identity behind a request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub roles: Vec<UserRole>,
}

impl Principal {
    /// Require a role, mapping absence to 403.
    ///
    /// # Errors
    ///
    /// Returns `403 Forbidden` when the principal lacks the role.
    pub fn require_role(&self, role: UserRole) -> Result<(), (StatusCode, String)> {
        if self.roles.contains(&role) {
            Ok(())
        } else {
            Err((StatusCode::FORBIDDEN, "Access denied".to_string()))
        }
    }
}

/// Authenticate a request from its `Authorization` header.
///
/// Only access tokens are accepted here; a refresh assertion never
/// authorizes an API call.
///
/// # Errors
///
/// Returns `401 Unauthorized` with a short reason when the header is
/// missing, the token fails verification, or the token is not an access
/// token.
pub(crate) fn require_auth(
    headers: &HeaderMap,
    auth_state: &AuthState,
) -> Result<Principal, (StatusCode, String)> {
    let Some(token) = extract_bearer_token(headers) else {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Missing bearer token".to_string(),
        ));
    };

    let claims = auth_state
        .signer()
        .verify_use(&token, TokenUse::Access)
        .map_err(|err| match err {
            token::Error::Expired => {
                (StatusCode::UNAUTHORIZED, "Access token expired".to_string())
            }
            _ => (StatusCode::UNAUTHORIZED, "Invalid access token".to_string()),
        })?;

    let roles: Vec<UserRole> = claims
        .roles
        .iter()
        .filter_map(|authority| UserRole::from_authority(authority))
        .collect();

    Ok(Principal {
        user_id: claims.user_id,
        email: claims.sub,
        roles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::state::AuthConfig;
    use crate::token::test_keys::TEST_PRIVATE_KEY_PEM;
    use crate::token::TokenSigner;
    use anyhow::Result;
    use axum::http::{header::AUTHORIZATION, HeaderValue};

    fn auth_state() -> Result<AuthState> {
        let signer = TokenSigner::from_private_key_pem_or_der(
            TEST_PRIVATE_KEY_PEM.as_bytes(),
            "https://api.feria.test",
            "k1",
            900,
        )?;
        Ok(AuthState::new(
            AuthConfig::new().with_issuer("https://api.feria.test".to_string()),
            signer,
        ))
    }

    fn bearer(token: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
        Ok(headers)
    }

    #[test]
    fn accepts_a_valid_access_token() -> Result<()> {
        let state = auth_state()?;
        let user_id = Uuid::new_v4();
        let token = state.signer().issue_access_token(
            "alice@example.com",
            user_id,
            vec!["ROLE_ADMIN".to_string()],
        )?;

        let principal =
            require_auth(&bearer(&token)?, &state).map_err(|(_, message)| anyhow::anyhow!(message))?;
        assert_eq!(principal.user_id, user_id);
        assert_eq!(principal.email, "alice@example.com");
        assert!(principal.require_role(UserRole::Admin).is_ok());
        assert!(principal.require_role(UserRole::Seller).is_err());
        Ok(())
    }

    #[test]
    fn rejects_refresh_assertions() -> Result<()> {
        let state = auth_state()?;
        let token = state
            .signer()
            .issue_refresh_assertion("alice@example.com", Uuid::new_v4())?;

        let result = require_auth(&bearer(&token)?, &state);
        assert_eq!(result.err().map(|(status, _)| status), Some(StatusCode::UNAUTHORIZED));
        Ok(())
    }

    #[test]
    fn rejects_missing_header() -> Result<()> {
        let state = auth_state()?;
        let result = require_auth(&HeaderMap::new(), &state);
        assert_eq!(result.err().map(|(status, _)| status), Some(StatusCode::UNAUTHORIZED));
        Ok(())
    }

    #[test]
    fn unknown_claim_roles_do_not_become_roles() -> Result<()> {
        let state = auth_state()?;
        let token = state.signer().issue_access_token(
            "alice@example.com",
            Uuid::new_v4(),
            vec!["ROLE_WIZARD".to_string(), "ROLE_BUYER".to_string()],
        )?;

        let principal =
            require_auth(&bearer(&token)?, &state).map_err(|(_, message)| anyhow::anyhow!(message))?;
        assert_eq!(principal.roles, vec![UserRole::Buyer]);
        Ok(())
    }
}
