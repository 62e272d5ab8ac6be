//! Database operations for refresh tokens.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{warn, Instrument};
use uuid::Uuid;

use super::{evaluate, generate_refresh_token, ClientContext, RefreshTokenRecord, ValidateError};
use crate::users::store::is_unique_violation;

const TOKEN_COLUMNS: &str = "id, token, user_id, expires_at, created_at, revoked_at, \
                             replaced_by_token, ip_address, user_agent";

fn record_from_row(row: &PgRow) -> RefreshTokenRecord {
    RefreshTokenRecord {
        id: row.get("id"),
        token: row.get("token"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
        revoked_at: row.get("revoked_at"),
        replaced_by_token: row.get("replaced_by_token"),
        ip_address: row.get("ip_address"),
        user_agent: row.get("user_agent"),
    }
}

/// Create a refresh token for a user, enforcing the active-session cap.
///
/// When the user already holds `max_active_sessions` active tokens, the
/// oldest one is revoked first. The count and the insert run in one
/// transaction, so concurrent logins can only briefly overshoot the cap and
/// the next create corrects it.
///
/// # Errors
///
/// Returns an error if the transaction fails.
pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    client: &ClientContext,
    refresh_token_days: i64,
    max_active_sessions: i64,
) -> Result<RefreshTokenRecord> {
    let mut tx = pool.begin().await.context("begin create transaction")?;

    let active = count_active(&mut tx, user_id).await?;
    if active >= max_active_sessions {
        revoke_oldest(&mut tx, user_id).await?;
    }

    let record = insert_token(&mut tx, user_id, client, refresh_token_days).await?;
    tx.commit().await.context("commit create transaction")?;
    Ok(record)
}

/// Validate a presented refresh token.
///
/// The replacement-link check runs before anything else: a rotated token
/// showing up again means the value leaked, so every active session for that
/// user is revoked before the `Compromised` error is returned.
///
/// # Errors
///
/// Returns a [`ValidateError`] describing why the token was rejected.
pub async fn validate(pool: &PgPool, token: &str) -> Result<RefreshTokenRecord, ValidateError> {
    let record = lookup(pool, token).await?;
    let now = Utc::now();

    match evaluate(record.as_ref(), now) {
        Ok(()) => Ok(record.ok_or(ValidateError::Unknown)?),
        Err(ValidateError::Compromised) => {
            if let Some(record) = record {
                warn!(
                    user_id = %record.user_id,
                    "Refresh token reuse detected; revoking all sessions"
                );
                revoke_all(pool, record.user_id).await?;
            }
            Err(ValidateError::Compromised)
        }
        Err(err) => Err(err),
    }
}

/// Rotate `old_token` into a fresh one for the same user.
///
/// The new row is inserted before the old one is revoked, in one
/// transaction; a crash in between leaves the old token usable instead of
/// locking the user out. The link update only matches a still-active old
/// row: when a concurrent request revoked or rotated it after the caller's
/// validate, the whole transaction is rolled back so no successor without a
/// replacement link ever becomes visible.
///
/// # Errors
///
/// Returns [`ValidateError::Revoked`] when the old token lost its active
/// state to a concurrent request, or [`ValidateError::Storage`] if the
/// transaction fails.
pub async fn rotate(
    pool: &PgPool,
    old_token: &str,
    user_id: Uuid,
    client: &ClientContext,
    refresh_token_days: i64,
) -> Result<RefreshTokenRecord, ValidateError> {
    let mut tx = pool.begin().await.context("begin rotate transaction")?;

    let new_record = insert_token(&mut tx, user_id, client, refresh_token_days).await?;

    let query = r"
        UPDATE refresh_tokens
        SET revoked_at = NOW(), replaced_by_token = $2
        WHERE token = $1
          AND revoked_at IS NULL
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(old_token)
        .bind(&new_record.token)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to link rotated token")?;

    if result.rows_affected() == 0 {
        // Lost a race: another request revoked or rotated the old token
        // after it was validated. Abandon the new row.
        tx.rollback().await.context("rollback rotate transaction")?;
        return Err(ValidateError::Revoked);
    }

    tx.commit().await.context("commit rotate transaction")?;
    Ok(new_record)
}

/// Fetch a refresh token row by value.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn lookup(pool: &PgPool, token: &str) -> Result<Option<RefreshTokenRecord>> {
    let query = format!("SELECT {TOKEN_COLUMNS} FROM refresh_tokens WHERE token = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(token)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup refresh token")?;

    Ok(row.map(|row| record_from_row(&row)))
}

/// Revoke a single token without a replacement link. Idempotent.
///
/// # Errors
///
/// Returns an error if the update fails.
pub async fn revoke(pool: &PgPool, token: &str) -> Result<bool> {
    let query = r"
        UPDATE refresh_tokens
        SET revoked_at = NOW()
        WHERE token = $1
          AND revoked_at IS NULL
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(token)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to revoke refresh token")?;
    Ok(result.rows_affected() > 0)
}

/// Revoke every active token the user holds. Returns the number revoked.
///
/// # Errors
///
/// Returns an error if the update fails.
pub async fn revoke_all(pool: &PgPool, user_id: Uuid) -> Result<u64> {
    let query = r"
        UPDATE refresh_tokens
        SET revoked_at = NOW()
        WHERE user_id = $1
          AND revoked_at IS NULL
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to revoke user sessions")?;
    Ok(result.rows_affected())
}

/// Delete rows that expired strictly before `now`. Rows expiring exactly at
/// `now` are retained.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub async fn purge_expired(pool: &PgPool, now: DateTime<Utc>) -> Result<u64> {
    let query = "DELETE FROM refresh_tokens WHERE expires_at < $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(now)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to purge expired refresh tokens")?;
    Ok(result.rows_affected())
}

/// List a user's active sessions, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list_active(pool: &PgPool, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>> {
    let query = format!(
        r"
        SELECT {TOKEN_COLUMNS} FROM refresh_tokens
        WHERE user_id = $1
          AND revoked_at IS NULL
          AND expires_at > NOW()
        ORDER BY created_at ASC
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .bind(user_id)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list active sessions")?;

    Ok(rows.iter().map(record_from_row).collect())
}

async fn count_active(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
) -> Result<i64> {
    let query = r"
        SELECT COUNT(*) AS active
        FROM refresh_tokens
        WHERE user_id = $1
          AND revoked_at IS NULL
          AND expires_at > NOW()
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_one(&mut **tx)
        .instrument(span)
        .await
        .context("failed to count active sessions")?;
    Ok(row.get("active"))
}

async fn revoke_oldest(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
) -> Result<()> {
    // Eviction, not rotation: no replacement link is recorded.
    let query = r"
        UPDATE refresh_tokens
        SET revoked_at = NOW()
        WHERE id = (
            SELECT id FROM refresh_tokens
            WHERE user_id = $1
              AND revoked_at IS NULL
              AND expires_at > NOW()
            ORDER BY created_at ASC
            LIMIT 1
        )
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to revoke oldest session")?;
    Ok(())
}

async fn insert_token(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    client: &ClientContext,
    refresh_token_days: i64,
) -> Result<RefreshTokenRecord> {
    let query = format!(
        r"
        INSERT INTO refresh_tokens (token, user_id, expires_at, ip_address, user_agent)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 day'), $4, $5)
        RETURNING {TOKEN_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );

    for _ in 0..3 {
        let token = generate_refresh_token()?;
        let result = sqlx::query(&query)
            .bind(&token)
            .bind(user_id)
            .bind(refresh_token_days)
            .bind(client.ip_address.as_deref())
            .bind(client.user_agent.as_deref())
            .fetch_one(&mut **tx)
            .instrument(span.clone())
            .await;

        match result {
            Ok(row) => return Ok(record_from_row(&row)),
            Err(err) if is_unique_violation(&err) => {}
            Err(err) => return Err(err).context("failed to insert refresh token"),
        }
    }

    Err(anyhow!("failed to generate unique refresh token"))
}
