//! JWKS endpoint publishing the token verification key.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;

use super::auth::AuthState;

#[utoipa::path(
    get,
    path = "/.well-known/jwks.json",
    responses(
        (status = 200, description = "JWKS public keys", body = String, content_type = "application/json")
    ),
    tag = "jwks"
)]
pub async fn jwks(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    match auth_state
        .signer()
        .jwks()
        .map_err(anyhow::Error::from)
        .and_then(|jwks| jwks.to_json_pretty().map_err(anyhow::Error::from))
    {
        Ok(jwks_json) => (StatusCode::OK, jwks_json),
        Err(err) => {
            error!("Failed to render JWKS: {err:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "{}".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::test_support::auth_state;
    use anyhow::Result;

    #[tokio::test]
    async fn jwks_serves_the_signing_key() -> Result<()> {
        let response = jwks(Extension(auth_state()?)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        let keys = value
            .get("keys")
            .and_then(serde_json::Value::as_array)
            .map(Vec::len);
        assert_eq!(keys, Some(1));
        Ok(())
    }
}
