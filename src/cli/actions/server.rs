use crate::api;
use crate::api::handlers::auth::AuthConfig;
use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::session::purge::PurgeWorkerConfig;
use crate::token::TokenSigner;
use anyhow::{Context, Result};

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            private_key,
            key_id,
            issuer,
            access_token_ttl,
            refresh_token_days,
            max_sessions,
            purge_interval,
            frontend_url,
        } => {
            let globals = GlobalArgs::new(
                tokio::fs::read(&private_key)
                    .await
                    .with_context(|| format!("Failed to read signing key: {private_key}"))?,
            );

            let signer = TokenSigner::from_private_key_pem_or_der(
                globals.signing_key(),
                &issuer,
                &key_id,
                access_token_ttl,
            )
            .context("Failed to load signing key")?;

            let auth_config = AuthConfig::new()
                .with_issuer(issuer)
                .with_access_token_ttl_seconds(access_token_ttl)
                .with_refresh_token_days(refresh_token_days)
                .with_max_active_sessions(max_sessions)
                .with_frontend_base_url(frontend_url);

            let purge_config = PurgeWorkerConfig::new().with_interval_seconds(purge_interval);

            api::new(port, dsn, auth_config, signer, purge_config).await?;
        }
    }

    Ok(())
}
