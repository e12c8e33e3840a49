//! PostgreSQL implementation of the short URL repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;

use crate::domain::entities::{NewShortUrl, ShortUrl};
use crate::domain::repositories::UrlRepository;
use crate::error::AppError;
use crate::utils::db_error::is_unique_violation_on_code;

const SHORT_URL_COLUMNS: &str = "id, code, destination, owner_id, secret_hash, custom_alias, \
     expires_at, is_active, click_count, created_at, updated_at, deleted_at";

#[derive(Debug, FromRow)]
struct ShortUrlRow {
    id: i64,
    code: String,
    destination: String,
    owner_id: Option<i64>,
    secret_hash: Option<String>,
    custom_alias: bool,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
    click_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<ShortUrlRow> for ShortUrl {
    fn from(r: ShortUrlRow) -> Self {
        ShortUrl {
            id: r.id,
            code: r.code,
            destination: r.destination,
            owner: r.owner_id,
            secret_hash: r.secret_hash,
            custom_alias: r.custom_alias,
            expires_at: r.expires_at,
            active: r.is_active,
            click_count: r.click_count,
            created_at: r.created_at,
            updated_at: r.updated_at,
            deleted_at: r.deleted_at,
        }
    }
}

/// Maps a write error, turning code-index conflicts into [`AppError::CodeExists`].
fn map_write_error(e: sqlx::Error, code: &str) -> AppError {
    if is_unique_violation_on_code(&e) {
        AppError::CodeExists {
            code: code.to_string(),
        }
    } else {
        e.into()
    }
}

/// PostgreSQL repository for short URL records.
///
/// Uses SQLx prepared statements for SQL injection protection. Soft-deleted
/// rows are excluded from every query.
pub struct PgUrlRepository {
    pool: Arc<PgPool>,
}

impl PgUrlRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UrlRepository for PgUrlRepository {
    async fn create(&self, new_url: NewShortUrl) -> Result<ShortUrl, AppError> {
        let sql = format!(
            "INSERT INTO short_urls (code, destination, owner_id, secret_hash, custom_alias, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {SHORT_URL_COLUMNS}"
        );

        let row = sqlx::query_as::<_, ShortUrlRow>(&sql)
            .bind(&new_url.code)
            .bind(&new_url.destination)
            .bind(new_url.owner)
            .bind(&new_url.secret_hash)
            .bind(new_url.custom_alias)
            .bind(new_url.expires_at)
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(|e| map_write_error(e, &new_url.code))?;

        Ok(row.into())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ShortUrl>, AppError> {
        let sql = format!(
            "SELECT {SHORT_URL_COLUMNS} FROM short_urls WHERE id = $1 AND deleted_at IS NULL"
        );

        let row = sqlx::query_as::<_, ShortUrlRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(Into::into))
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<ShortUrl>, AppError> {
        let sql = format!(
            "SELECT {SHORT_URL_COLUMNS} FROM short_urls WHERE code = $1 AND deleted_at IS NULL"
        );

        let row = sqlx::query_as::<_, ShortUrlRow>(&sql)
            .bind(code)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(Into::into))
    }

    async fn get_active_by_code(&self, code: &str) -> Result<Option<ShortUrl>, AppError> {
        let sql = format!(
            "SELECT {SHORT_URL_COLUMNS} FROM short_urls \
             WHERE code = $1 \
               AND deleted_at IS NULL \
               AND is_active \
               AND (expires_at IS NULL OR expires_at > NOW())"
        );

        let row = sqlx::query_as::<_, ShortUrlRow>(&sql)
            .bind(code)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(Into::into))
    }

    async fn update(&self, url: &ShortUrl) -> Result<ShortUrl, AppError> {
        let sql = format!(
            "UPDATE short_urls \
             SET code = $2, destination = $3, secret_hash = $4, expires_at = $5, \
                 is_active = $6, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {SHORT_URL_COLUMNS}"
        );

        let row = sqlx::query_as::<_, ShortUrlRow>(&sql)
            .bind(url.id)
            .bind(&url.code)
            .bind(&url.destination)
            .bind(&url.secret_hash)
            .bind(url.expires_at)
            .bind(url.active)
            .fetch_optional(self.pool.as_ref())
            .await
            .map_err(|e| map_write_error(e, &url.code))?;

        row.map(Into::into).ok_or(AppError::NotFound)
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE short_urls SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_click_count(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE short_urls SET click_count = click_count + 1 WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn list_expired(&self, limit: i64) -> Result<Vec<ShortUrl>, AppError> {
        let sql = format!(
            "SELECT {SHORT_URL_COLUMNS} FROM short_urls \
             WHERE deleted_at IS NULL \
               AND is_active \
               AND expires_at IS NOT NULL \
               AND expires_at <= NOW() \
             ORDER BY expires_at \
             LIMIT $1"
        );

        let rows = sqlx::query_as::<_, ShortUrlRow>(&sql)
            .bind(limit)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn deactivate_expired(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE short_urls SET is_active = FALSE, updated_at = NOW() \
             WHERE id = $1 \
               AND deleted_at IS NULL \
               AND is_active \
               AND expires_at IS NOT NULL \
               AND expires_at <= NOW()",
        )
        .bind(id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM short_urls WHERE code = $1 AND deleted_at IS NULL)",
        )
        .bind(code)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(exists)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }
}
