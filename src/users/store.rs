//! Database access for user accounts.

use anyhow::{Context, Result};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{roles_from_authorities, UserRecord, UserRole};

/// Outcome when attempting to create a new account.
#[derive(Debug)]
pub enum SignupOutcome {
    Created(UserRecord),
    Conflict,
}

const USER_COLUMNS: &str =
    "id, email, password_hash, roles, is_active, created_at, last_login_at";

fn record_from_row(row: &PgRow) -> UserRecord {
    let authorities: Vec<String> = row.get("roles");
    UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        roles: roles_from_authorities(&authorities),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        last_login_at: row.get("last_login_at"),
    }
}

/// Look up an account by normalized email.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    Ok(row.map(|row| record_from_row(&row)))
}

/// Look up an account by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn find_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    Ok(row.map(|row| record_from_row(&row)))
}

/// Create an account with an already-validated email and password hash.
///
/// # Errors
///
/// Returns an error if the insert fails for any reason other than a
/// duplicate email, which maps to [`SignupOutcome::Conflict`].
pub async fn insert_user(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
    roles: &[UserRole],
) -> Result<SignupOutcome> {
    let authorities: Vec<String> = roles
        .iter()
        .map(|role| role.authority().to_string())
        .collect();

    let query = format!(
        r"
        INSERT INTO users (email, password_hash, roles)
        VALUES ($1, $2, $3)
        RETURNING {USER_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(email)
        .bind(password_hash)
        .bind(&authorities)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(SignupOutcome::Created(record_from_row(&row))),
        Err(err) if is_unique_violation(&err) => Ok(SignupOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

/// Replace the stored password hash.
///
/// # Errors
///
/// Returns an error if the update fails.
pub async fn update_password(pool: &PgPool, user_id: Uuid, password_hash: &str) -> Result<()> {
    let query = "UPDATE users SET password_hash = $2 WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(password_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update password hash")?;
    Ok(())
}

/// Record a successful login.
///
/// # Errors
///
/// Returns an error if the update fails.
pub async fn update_last_login(pool: &PgPool, user_id: Uuid) -> Result<()> {
    let query = "UPDATE users SET last_login_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update last login")?;
    Ok(())
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
