//! Click persistence and unique-visitor tracking.

use std::sync::Arc;
use std::time::Duration;

use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

use crate::domain::entities::{Click, NewClick};
use crate::domain::repositories::{ClickRepository, UrlRepository};
use crate::error::AppError;
use crate::infrastructure::cache::ResolutionCache;
use crate::utils::deadline::{DEFAULT_STORE_TIMEOUT, with_deadline};

/// Bounded exponential backoff for failed click writes.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero disables retrying.
    pub retries: usize,
    pub base_delay_ms: u64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            base_delay_ms: 50,
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    fn strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(self.base_delay_ms)
            .max_delay(self.max_delay)
            .map(jitter)
            .take(self.retries)
    }
}

/// Only transient store failures are worth another attempt.
fn is_transient(e: &AppError) -> bool {
    matches!(e, AppError::StoreUnavailable(_))
}

/// Persists clicks and maintains the cache-backed unique-visitor set.
///
/// Every successful [`Self::record`] inserts exactly one click row and bumps
/// the owning record's `click_count` by exactly one.
pub struct ClickRecorder<U: UrlRepository, C: ClickRepository> {
    url_repository: Arc<U>,
    click_repository: Arc<C>,
    cache: ResolutionCache,
    retry: RetryPolicy,
    store_timeout: Duration,
}

impl<U: UrlRepository, C: ClickRepository> ClickRecorder<U, C> {
    pub fn new(
        url_repository: Arc<U>,
        click_repository: Arc<C>,
        cache: ResolutionCache,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            url_repository,
            click_repository,
            cache,
            retry,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// Inserts a click row, then increments the record's click counter.
    ///
    /// Each step is retried separately on transient failures, so a retry
    /// never inserts a second row for the same click.
    ///
    /// # Errors
    ///
    /// Returns the last error once retries are exhausted, or immediately for
    /// non-transient errors such as [`AppError::Validation`] (unknown record).
    pub async fn record(&self, new_click: NewClick) -> Result<Click, AppError> {
        let short_url_id = new_click.short_url_id;

        let click = RetryIf::spawn(
            self.retry.strategy(),
            move || {
                let click = new_click.clone();
                async move {
                    with_deadline(
                        self.store_timeout,
                        "create_click",
                        self.click_repository.create(click),
                    )
                    .await
                    .inspect_err(|e| tracing::warn!(short_url_id, error = %e, "Click insert failed"))
                }
            },
            is_transient,
        )
        .await?;

        RetryIf::spawn(
            self.retry.strategy(),
            move || async move {
                with_deadline(
                    self.store_timeout,
                    "increment_click_count",
                    self.url_repository.increment_click_count(short_url_id),
                )
                .await
                .inspect_err(
                    |e| tracing::warn!(short_url_id, error = %e, "Click count increment failed"),
                )
            },
            is_transient,
        )
        .await?;

        tracing::debug!(short_url_id, click_id = click.id, "Click recorded");
        Ok(click)
    }

    /// Returns true if `ip` was not seen for `short_url_id` within the
    /// tracking window. Cache failures count as "not unique".
    pub async fn mark_unique_if_new(&self, short_url_id: i64, ip: &str) -> bool {
        self.cache.mark_unique_if_new(short_url_id, ip).await
    }
}
