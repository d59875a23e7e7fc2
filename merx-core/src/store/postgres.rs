use async_trait::async_trait;
use chrono::{DateTime, Utc};
use merx_model::{Role, StoredToken, UserRecord};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use super::CredentialStore;
use crate::error::StoreError;

/// Embedded schema migrations for the credential store.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const SELECT_COLUMNS: &str = "\
    id, username, email, role, password_digest, password_salt, email_confirmed, \
    refresh_token, refresh_token_created_at, refresh_token_expires_at, \
    email_confirm_token, email_confirm_token_created_at, email_confirm_token_expires_at, \
    password_reset_token, password_reset_token_created_at, password_reset_token_expires_at, \
    created_at, updated_at";

/// Postgres-backed credential store.
///
/// Updates are whole-record, keyed by primary key, in one statement,
/// which gives the per-record atomicity the port requires.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_where(
        &self,
        predicate: &str,
        value: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM users WHERE {predicate} = $1");
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::unavailable)?;
        row.map(map_row).transpose()
    }
}

fn read_token(
    row: &PgRow,
    value_col: &str,
    created_col: &str,
    expires_col: &str,
) -> Result<Option<StoredToken>, StoreError> {
    let value: Option<String> = row.try_get(value_col).map_err(StoreError::unavailable)?;
    let created_at: Option<DateTime<Utc>> =
        row.try_get(created_col).map_err(StoreError::unavailable)?;
    let expires_at: Option<DateTime<Utc>> =
        row.try_get(expires_col).map_err(StoreError::unavailable)?;

    Ok(match (value, created_at, expires_at) {
        (Some(value), Some(created_at), Some(expires_at)) => Some(StoredToken {
            value,
            created_at,
            expires_at,
        }),
        _ => None,
    })
}

fn map_row(row: PgRow) -> Result<UserRecord, StoreError> {
    let role: String = row.try_get("role").map_err(StoreError::unavailable)?;
    let role: Role = role.parse().map_err(StoreError::unavailable)?;

    Ok(UserRecord {
        id: row.try_get("id").map_err(StoreError::unavailable)?,
        username: row.try_get("username").map_err(StoreError::unavailable)?,
        email: row.try_get("email").map_err(StoreError::unavailable)?,
        role,
        password_digest: row
            .try_get("password_digest")
            .map_err(StoreError::unavailable)?,
        password_salt: row
            .try_get("password_salt")
            .map_err(StoreError::unavailable)?,
        email_confirmed: row
            .try_get("email_confirmed")
            .map_err(StoreError::unavailable)?,
        refresh_token: read_token(
            &row,
            "refresh_token",
            "refresh_token_created_at",
            "refresh_token_expires_at",
        )?,
        email_confirm_token: read_token(
            &row,
            "email_confirm_token",
            "email_confirm_token_created_at",
            "email_confirm_token_expires_at",
        )?,
        password_reset_token: read_token(
            &row,
            "password_reset_token",
            "password_reset_token_created_at",
            "password_reset_token_expires_at",
        )?,
        created_at: row.try_get("created_at").map_err(StoreError::unavailable)?,
        updated_at: row.try_get("updated_at").map_err(StoreError::unavailable)?,
    })
}

fn token_parts(
    token: &Option<StoredToken>,
) -> (Option<&str>, Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    match token {
        Some(t) => (Some(t.value.as_str()), Some(t.created_at), Some(t.expires_at)),
        None => (None, None, None),
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::unavailable)?;
        row.map(map_row).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        self.fetch_where("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.fetch_where("email", email).await
    }

    async fn find_by_refresh_token(&self, value: &str) -> Result<Option<UserRecord>, StoreError> {
        self.fetch_where("refresh_token", value).await
    }

    async fn find_by_email_confirm_token(
        &self,
        value: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        self.fetch_where("email_confirm_token", value).await
    }

    async fn find_by_reset_token(&self, value: &str) -> Result<Option<UserRecord>, StoreError> {
        self.fetch_where("password_reset_token", value).await
    }

    async fn insert(&self, user: &UserRecord) -> Result<(), StoreError> {
        let (refresh, refresh_created, refresh_expires) = token_parts(&user.refresh_token);
        let (confirm, confirm_created, confirm_expires) = token_parts(&user.email_confirm_token);
        let (reset, reset_created, reset_expires) = token_parts(&user.password_reset_token);

        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, email, role, password_digest, password_salt, email_confirmed,
                refresh_token, refresh_token_created_at, refresh_token_expires_at,
                email_confirm_token, email_confirm_token_created_at, email_confirm_token_expires_at,
                password_reset_token, password_reset_token_created_at, password_reset_token_expires_at,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.password_digest)
        .bind(&user.password_salt)
        .bind(user.email_confirmed)
        .bind(refresh)
        .bind(refresh_created)
        .bind(refresh_expires)
        .bind(confirm)
        .bind(confirm_created)
        .bind(confirm_expires)
        .bind(reset)
        .bind(reset_created)
        .bind(reset_expires)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if err
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                StoreError::Duplicate(user.username.clone())
            } else {
                StoreError::unavailable(err)
            }
        })?;

        Ok(())
    }

    async fn update(&self, user: &UserRecord) -> Result<(), StoreError> {
        let (refresh, refresh_created, refresh_expires) = token_parts(&user.refresh_token);
        let (confirm, confirm_created, confirm_expires) = token_parts(&user.email_confirm_token);
        let (reset, reset_created, reset_expires) = token_parts(&user.password_reset_token);

        let result = sqlx::query(
            r#"
            UPDATE users SET
                username = $2,
                email = $3,
                role = $4,
                password_digest = $5,
                password_salt = $6,
                email_confirmed = $7,
                refresh_token = $8,
                refresh_token_created_at = $9,
                refresh_token_expires_at = $10,
                email_confirm_token = $11,
                email_confirm_token_created_at = $12,
                email_confirm_token_expires_at = $13,
                password_reset_token = $14,
                password_reset_token_created_at = $15,
                password_reset_token_expires_at = $16,
                updated_at = $17
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.password_digest)
        .bind(&user.password_salt)
        .bind(user.email_confirmed)
        .bind(refresh)
        .bind(refresh_created)
        .bind(refresh_expires)
        .bind(confirm)
        .bind(confirm_created)
        .bind(confirm_expires)
        .bind(reset)
        .bind(reset_created)
        .bind(reset_expires)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::unavailable)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Unavailable(format!(
                "unknown user id: {}",
                user.id
            )));
        }

        Ok(())
    }
}
