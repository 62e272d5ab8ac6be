//! Background purge of expired refresh tokens.
//!
//! Rotated and revoked rows are kept while unexpired so reuse of a rotated
//! token can still be detected; once a row's `expires_at` has passed it can
//! never be presented successfully again and only takes up space. A
//! background task deletes those rows on a fixed interval.

use sqlx::PgPool;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

use super::store::purge_expired;

#[derive(Clone, Copy, Debug)]
pub struct PurgeWorkerConfig {
    interval: Duration,
}

impl PurgeWorkerConfig {
    /// Default purge config: once a day.
    #[must_use]
    pub fn new() -> Self {
        Self {
            interval: Duration::from_secs(24 * 60 * 60),
        }
    }

    #[must_use]
    pub fn with_interval_seconds(mut self, seconds: u64) -> Self {
        self.interval = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn normalize(self) -> Self {
        let interval = if self.interval.is_zero() {
            Duration::from_secs(1)
        } else {
            self.interval
        };
        Self { interval }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for PurgeWorkerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn the purge loop. Failures are logged and the loop keeps running.
pub fn spawn_purge_worker(pool: PgPool, config: PurgeWorkerConfig) {
    let config = config.normalize();
    tokio::spawn(async move {
        loop {
            sleep(config.interval()).await;
            match purge_expired(&pool, chrono::Utc::now()).await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "Purged expired refresh tokens"),
                Err(err) => error!("Failed to purge expired refresh tokens: {err}"),
            }
        }
    });
}
