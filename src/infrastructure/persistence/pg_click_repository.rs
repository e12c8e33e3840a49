//! PostgreSQL implementation of the click repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;

use crate::domain::entities::{Click, ClickEnrichment, NewClick};
use crate::domain::repositories::ClickRepository;
use crate::error::AppError;
use crate::utils::db_error::is_foreign_key_violation;

#[derive(Debug, FromRow)]
struct ClickRow {
    id: i64,
    short_url_id: i64,
    ip_address: Option<String>,
    user_agent: Option<String>,
    referer: Option<String>,
    country: String,
    region: String,
    city: String,
    device: String,
    browser: String,
    os: String,
    clicked_at: DateTime<Utc>,
}

impl From<ClickRow> for Click {
    fn from(r: ClickRow) -> Self {
        Click {
            id: r.id,
            short_url_id: r.short_url_id,
            ip_address: r.ip_address,
            user_agent: r.user_agent,
            referer: r.referer,
            enrichment: ClickEnrichment {
                country: r.country,
                region: r.region,
                city: r.city,
                device: r.device,
                browser: r.browser,
                os: r.os,
            },
            clicked_at: r.clicked_at,
        }
    }
}

/// PostgreSQL repository for click events.
pub struct PgClickRepository {
    pool: Arc<PgPool>,
}

impl PgClickRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClickRepository for PgClickRepository {
    async fn create(&self, new_click: NewClick) -> Result<Click, AppError> {
        let NewClick {
            short_url_id,
            metadata,
            enrichment,
            clicked_at,
        } = new_click;

        let row = sqlx::query_as::<_, ClickRow>(
            r#"
            INSERT INTO clicks
                (short_url_id, ip_address, user_agent, referer,
                 country, region, city, device, browser, os, clicked_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, short_url_id, ip_address, user_agent, referer,
                      country, region, city, device, browser, os, clicked_at
            "#,
        )
        .bind(short_url_id)
        .bind(metadata.ip_address)
        .bind(metadata.user_agent)
        .bind(metadata.referer)
        .bind(enrichment.country)
        .bind(enrichment.region)
        .bind(enrichment.city)
        .bind(enrichment.device)
        .bind(enrichment.browser)
        .bind(enrichment.os)
        .bind(clicked_at)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::validation(format!("short URL {short_url_id} does not exist"))
            } else {
                e.into()
            }
        })?;

        Ok(row.into())
    }

    async fn count_by_short_url(&self, short_url_id: i64) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clicks WHERE short_url_id = $1")
            .bind(short_url_id)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }
}
