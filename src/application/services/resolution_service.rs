//! Orchestration of short URL creation, resolution and lifecycle changes.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::code_generator::{CodeGenerator, CodeSettings};
use crate::domain::click_event::ClickEvent;
use crate::domain::entities::{ClickMetadata, NewShortUrl, ShortUrl, ShortUrlPatch};
use crate::domain::repositories::UrlRepository;
use crate::error::AppError;
use crate::infrastructure::cache::ResolutionCache;
use crate::utils::deadline::{DEFAULT_STORE_TIMEOUT, with_deadline};
use crate::utils::secret::{hash_secret, verify_secret};
use crate::utils::url_validator::validate_destination;

/// Default number of expired records handled per cleanup sweep.
pub const DEFAULT_CLEANUP_BATCH_SIZE: i64 = 100;

/// Input for [`ResolutionService::shorten`].
#[derive(Debug, Clone, Default)]
pub struct ShortenRequest {
    pub destination: String,
    pub owner: Option<i64>,
    pub custom_alias: Option<String>,
    /// Raw secret required to resolve the link. Hashed before storage.
    pub secret: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ShortenRequest {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            ..Self::default()
        }
    }
}

/// Public contract consumed by the HTTP layer and the admin CLI.
///
/// Composes the code generator, the URL store, the resolution cache and the
/// click queue. The store is the source of truth for every access-control
/// decision (active, expiry, secret); the cache only accelerates lookups and
/// is invalidated before any mutating call returns.
pub struct ResolutionService<U: UrlRepository> {
    url_repository: Arc<U>,
    code_generator: CodeGenerator<U>,
    cache: ResolutionCache,
    click_sender: mpsc::Sender<ClickEvent>,
    store_timeout: Duration,
    cleanup_batch_size: i64,
    dropped_clicks: AtomicU64,
}

impl<U: UrlRepository> ResolutionService<U> {
    pub fn new(
        url_repository: Arc<U>,
        code_settings: CodeSettings,
        cache: ResolutionCache,
        click_sender: mpsc::Sender<ClickEvent>,
    ) -> Self {
        Self {
            code_generator: CodeGenerator::new(url_repository.clone(), code_settings),
            url_repository,
            cache,
            click_sender,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            cleanup_batch_size: DEFAULT_CLEANUP_BATCH_SIZE,
            dropped_clicks: AtomicU64::new(0),
        }
    }

    /// Sets the deadline applied to every store call, including those made
    /// by the code generator.
    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.code_generator = self.code_generator.with_store_timeout(store_timeout);
        self.store_timeout = store_timeout;
        self
    }

    pub fn with_cleanup_batch_size(mut self, batch_size: i64) -> Self {
        self.cleanup_batch_size = batch_size;
        self
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Number of click events dropped because the queue was full or closed.
    pub fn dropped_clicks(&self) -> u64 {
        self.dropped_clicks.load(Ordering::Relaxed)
    }

    /// Remaining click queue capacity, or `None` once the worker is gone.
    pub fn click_queue_capacity(&self) -> Option<usize> {
        if self.click_sender.is_closed() {
            None
        } else {
            Some(self.click_sender.capacity())
        }
    }

    /// Reports whether the store answers within the deadline.
    pub async fn store_healthy(&self) -> bool {
        with_deadline(self.store_timeout, "ping", self.url_repository.ping())
            .await
            .is_ok()
    }

    /// Creates a short URL and primes the cache with it.
    ///
    /// A custom alias is validated and used verbatim; otherwise a random code
    /// is generated. A unique violation from the store is treated as a
    /// collision: random codes are regenerated up to the retry bound, custom
    /// aliases fail with [`AppError::AliasExists`].
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidUrl`] if the destination is not `http`/`https`
    /// - [`AppError::Validation`] if `expires_at` is not in the future or the secret is empty
    /// - [`AppError::InvalidAliasFormat`] / [`AppError::AliasExists`] for bad or taken aliases
    /// - [`AppError::GenerationExhausted`] if no free random code was found
    /// - [`AppError::StoreUnavailable`] on store failure or timeout
    pub async fn shorten(&self, request: ShortenRequest) -> Result<ShortUrl, AppError> {
        let destination = validate_destination(&request.destination)?;

        if let Some(expires_at) = request.expires_at {
            ensure_future(expires_at)?;
        }

        let secret_hash = request.secret.as_deref().map(hash_new_secret).transpose()?;

        let record = match request.custom_alias {
            Some(alias) => {
                let code = self.code_generator.generate_custom(&alias).await?;
                let new_url = NewShortUrl {
                    code,
                    destination,
                    owner: request.owner,
                    secret_hash,
                    custom_alias: true,
                    expires_at: request.expires_at,
                };

                self.create(new_url).await.map_err(|e| match e {
                    AppError::CodeExists { .. } => AppError::AliasExists { alias },
                    other => other,
                })?
            }
            None => {
                self.create_with_random_code(
                    destination,
                    request.owner,
                    secret_hash,
                    request.expires_at,
                )
                .await?
            }
        };

        self.cache
            .put(&record.code, &record.destination, record.owner)
            .await;

        tracing::info!(
            short_url_id = record.id,
            code = %record.code,
            custom_alias = record.custom_alias,
            "Short URL created"
        );

        Ok(record)
    }

    /// Draws and inserts random codes. A collision found by the existence
    /// check and a unique violation at insert both use up one attempt of the
    /// same `max_attempts` budget.
    async fn create_with_random_code(
        &self,
        destination: String,
        owner: Option<i64>,
        secret_hash: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<ShortUrl, AppError> {
        let max_attempts = self.code_generator.max_attempts();

        for attempt in 1..=max_attempts {
            let Some(code) = self.code_generator.try_random_code().await? else {
                continue;
            };
            let new_url = NewShortUrl {
                code,
                destination: destination.clone(),
                owner,
                secret_hash: secret_hash.clone(),
                custom_alias: false,
                expires_at,
            };

            match self.create(new_url).await {
                Ok(record) => return Ok(record),
                Err(AppError::CodeExists { code }) => {
                    tracing::debug!(attempt, code = %code, "Code taken at insert, regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!(
            attempts = max_attempts,
            "Random code generation exhausted"
        );

        Err(AppError::GenerationExhausted {
            attempts: max_attempts,
        })
    }

    async fn create(&self, new_url: NewShortUrl) -> Result<ShortUrl, AppError> {
        with_deadline(
            self.store_timeout,
            "create",
            self.url_repository.create(new_url),
        )
        .await
    }

    /// Resolves `code` to its destination and queues a click.
    ///
    /// The cache is consulted first, but the redirect decision is always made
    /// on the store record. The click is handed to the background worker with
    /// `try_send` and never delays the result.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if no live record uses the code
    /// - [`AppError::Gone`] if the record is inactive or expired
    /// - [`AppError::Unauthorized`] if the record has a secret and `supplied_secret` does not match
    /// - [`AppError::StoreUnavailable`] on store failure or timeout
    pub async fn resolve(
        &self,
        code: &str,
        supplied_secret: Option<&str>,
        metadata: ClickMetadata,
    ) -> Result<String, AppError> {
        let cached = self.cache.get(code).await;

        let record = with_deadline(
            self.store_timeout,
            "get_active_by_code",
            self.url_repository.get_active_by_code(code),
        )
        .await?;

        let Some(record) = record else {
            if cached.is_some() {
                self.cache.invalidate(code).await;
            }
            return Err(self.classify_missing(code).await?);
        };

        let cache_is_current = cached
            .as_ref()
            .is_some_and(|c| c.destination == record.destination && c.owner == record.owner);
        if !cache_is_current {
            self.cache
                .put(code, &record.destination, record.owner)
                .await;
        }

        if let Some(stored) = record.secret_hash.as_deref() {
            match supplied_secret {
                None => {
                    return Err(AppError::Unauthorized {
                        reason: "secret required",
                    });
                }
                Some(supplied) if !verify_secret(supplied, stored) => {
                    tracing::debug!(code, "Secret mismatch");
                    return Err(AppError::Unauthorized {
                        reason: "secret mismatch",
                    });
                }
                Some(_) => {}
            }
        }

        self.dispatch_click(ClickEvent::new(record.id, record.code, metadata));

        Ok(record.destination)
    }

    /// Decides between NotFound and Gone for a code with no resolvable record.
    async fn classify_missing(&self, code: &str) -> Result<AppError, AppError> {
        let record = with_deadline(
            self.store_timeout,
            "get_by_code",
            self.url_repository.get_by_code(code),
        )
        .await?;

        Ok(match record {
            Some(_) => AppError::Gone,
            None => AppError::NotFound,
        })
    }

    fn dispatch_click(&self, event: ClickEvent) {
        match self.click_sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                self.dropped_clicks.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    short_url_id = event.short_url_id,
                    "Click queue full, dropping click"
                );
            }
            Err(TrySendError::Closed(event)) => {
                self.dropped_clicks.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    short_url_id = event.short_url_id,
                    "Click worker stopped, dropping click"
                );
            }
        }
    }

    /// Applies an owner's patch and refreshes the cache before returning.
    ///
    /// The cache entry is invalidated unconditionally and re-populated only
    /// if the record is still accessible, so a following `resolve` never sees
    /// the old destination. Records without an owner cannot be updated.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if no live record has `id`
    /// - [`AppError::Unauthorized`] on owner mismatch
    /// - [`AppError::InvalidUrl`] / [`AppError::Validation`] for bad patch values
    /// - [`AppError::StoreUnavailable`] on store failure or timeout
    pub async fn update(
        &self,
        id: i64,
        owner: i64,
        patch: ShortUrlPatch,
    ) -> Result<ShortUrl, AppError> {
        let mut record = self.owned_record(id, owner).await?;

        if patch.is_empty() {
            return Ok(record);
        }

        if let Some(destination) = patch.destination {
            record.destination = validate_destination(&destination)?;
        }
        if let Some(active) = patch.active {
            record.active = active;
        }
        if let Some(expires_at) = patch.expires_at {
            if let Some(at) = expires_at {
                ensure_future(at)?;
            }
            record.expires_at = expires_at;
        }
        if let Some(secret) = patch.secret {
            record.secret_hash = secret.as_deref().map(hash_new_secret).transpose()?;
        }

        let updated = with_deadline(
            self.store_timeout,
            "update",
            self.url_repository.update(&record),
        )
        .await?;

        self.cache.invalidate(&updated.code).await;
        if updated.is_accessible() {
            self.cache
                .put(&updated.code, &updated.destination, updated.owner)
                .await;
        }

        tracing::info!(short_url_id = updated.id, code = %updated.code, "Short URL updated");

        Ok(updated)
    }

    /// Soft-deletes an owner's record and invalidates its cache entry.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if no live record has `id`
    /// - [`AppError::Unauthorized`] on owner mismatch
    /// - [`AppError::StoreUnavailable`] on store failure or timeout
    pub async fn delete(&self, id: i64, owner: i64) -> Result<(), AppError> {
        let record = self.owned_record(id, owner).await?;

        let deleted = with_deadline(
            self.store_timeout,
            "soft_delete",
            self.url_repository.soft_delete(id),
        )
        .await?;

        self.cache.invalidate(&record.code).await;

        if !deleted {
            return Err(AppError::NotFound);
        }

        tracing::info!(short_url_id = id, code = %record.code, "Short URL deleted");
        Ok(())
    }

    async fn owned_record(&self, id: i64, owner: i64) -> Result<ShortUrl, AppError> {
        let record = with_deadline(
            self.store_timeout,
            "get_by_id",
            self.url_repository.get_by_id(id),
        )
        .await?
        .ok_or(AppError::NotFound)?;

        if record.owner != Some(owner) {
            return Err(AppError::Unauthorized {
                reason: "owner mismatch",
            });
        }

        Ok(record)
    }

    /// Deactivates one batch of expired records and invalidates their cache
    /// entries. Returns how many records were deactivated.
    ///
    /// Only the `active` flag is written, and only while the record still
    /// qualifies, so an owner's update made after listing is never
    /// overwritten. A failure on one record is logged and does not stop the
    /// sweep.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StoreUnavailable`] only if the expired list itself
    /// cannot be read.
    pub async fn cleanup_expired(&self) -> Result<usize, AppError> {
        let expired = with_deadline(
            self.store_timeout,
            "list_expired",
            self.url_repository.list_expired(self.cleanup_batch_size),
        )
        .await?;

        let mut deactivated = 0;
        for record in expired {
            match with_deadline(
                self.store_timeout,
                "deactivate_expired",
                self.url_repository.deactivate_expired(record.id),
            )
            .await
            {
                Ok(true) => {
                    self.cache.invalidate(&record.code).await;
                    deactivated += 1;
                }
                Ok(false) => {
                    tracing::debug!(
                        short_url_id = record.id,
                        code = %record.code,
                        "Short URL changed since listing, left as is"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        short_url_id = record.id,
                        code = %record.code,
                        error = %e,
                        "Failed to deactivate expired short URL"
                    );
                }
            }
        }

        if deactivated > 0 {
            tracing::info!(deactivated, "Expired short URLs deactivated");
        }

        Ok(deactivated)
    }
}

fn ensure_future(at: DateTime<Utc>) -> Result<(), AppError> {
    if at <= Utc::now() {
        return Err(AppError::validation("expiration time must be in the future"));
    }
    Ok(())
}

fn hash_new_secret(secret: &str) -> Result<String, AppError> {
    if secret.is_empty() {
        return Err(AppError::validation("secret must not be empty"));
    }
    hash_secret(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::short_url::sample_short_url;
    use crate::domain::repositories::MockUrlRepository;
    use crate::infrastructure::cache::{DEFAULT_CACHE_TIMEOUT, MemoryCache};
    use chrono::Duration as ChronoDuration;
    use mockall::predicate::eq;
    use std::sync::atomic::AtomicUsize;

    fn cache() -> ResolutionCache {
        ResolutionCache::new(Arc::new(MemoryCache::default()), DEFAULT_CACHE_TIMEOUT)
    }

    fn service(
        repo: MockUrlRepository,
        cache: ResolutionCache,
    ) -> (ResolutionService<MockUrlRepository>, mpsc::Receiver<ClickEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let service = ResolutionService::new(Arc::new(repo), CodeSettings::default(), cache, tx);
        (service, rx)
    }

    fn created_from(new_url: NewShortUrl) -> ShortUrl {
        let mut record = sample_short_url(1, &new_url.code, &new_url.destination);
        record.owner = new_url.owner;
        record.secret_hash = new_url.secret_hash;
        record.custom_alias = new_url.custom_alias;
        record.expires_at = new_url.expires_at;
        record
    }

    #[tokio::test]
    async fn test_shorten_random_primes_cache() {
        let mut repo = MockUrlRepository::new();
        repo.expect_exists_by_code().returning(|_| Ok(false));
        repo.expect_create()
            .times(1)
            .returning(|n| Ok(created_from(n)));

        let cache = cache();
        let (service, _rx) = service(repo, cache.clone());

        let mut request = ShortenRequest::new("https://example.com");
        request.owner = Some(1);
        let record = service.shorten(request).await.unwrap();

        assert_eq!(record.code.len(), 6);
        assert!(!record.custom_alias);
        let cached = cache.get(&record.code).await.unwrap();
        assert_eq!(cached.destination, "https://example.com");
        assert_eq!(cached.owner, Some(1));
    }

    #[tokio::test]
    async fn test_shorten_rejects_non_http_scheme() {
        let mut repo = MockUrlRepository::new();
        repo.expect_create().never();
        let (service, _rx) = service(repo, cache());

        let result = service.shorten(ShortenRequest::new("ftp://example.com")).await;

        assert!(matches!(result, Err(AppError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_shorten_rejects_past_expiry() {
        let repo = MockUrlRepository::new();
        let (service, _rx) = service(repo, cache());

        let mut request = ShortenRequest::new("https://example.com");
        request.expires_at = Some(Utc::now() - ChronoDuration::hours(1));

        assert!(matches!(
            service.shorten(request).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_shorten_hashes_secret() {
        let mut repo = MockUrlRepository::new();
        repo.expect_exists_by_code().returning(|_| Ok(false));
        repo.expect_create()
            .withf(|n| n.secret_hash.as_deref().is_some_and(|h| h != "abc" && h.contains('$')))
            .returning(|n| Ok(created_from(n)));
        let (service, _rx) = service(repo, cache());

        let mut request = ShortenRequest::new("https://example.com");
        request.secret = Some("abc".to_string());

        assert!(service.shorten(request).await.unwrap().has_secret());
    }

    #[tokio::test]
    async fn test_shorten_custom_alias_race_is_alias_exists() {
        let mut repo = MockUrlRepository::new();
        repo.expect_exists_by_code().returning(|_| Ok(false));
        repo.expect_create().times(1).returning(|n| {
            Err(AppError::CodeExists {
                code: n.code.clone(),
            })
        });
        let (service, _rx) = service(repo, cache());

        let mut request = ShortenRequest::new("https://example.com");
        request.custom_alias = Some("meeting".to_string());

        assert!(matches!(
            service.shorten(request).await,
            Err(AppError::AliasExists { alias }) if alias == "meeting"
        ));
    }

    #[tokio::test]
    async fn test_shorten_random_retries_insert_conflict() {
        let mut repo = MockUrlRepository::new();
        repo.expect_exists_by_code().returning(|_| Ok(false));
        let mut first = true;
        repo.expect_create().times(2).returning(move |n| {
            if std::mem::take(&mut first) {
                Err(AppError::CodeExists { code: n.code })
            } else {
                Ok(created_from(n))
            }
        });
        let (service, _rx) = service(repo, cache());

        assert!(service.shorten(ShortenRequest::new("https://example.com")).await.is_ok());
    }

    /// Repository whose first `checks` existence checks and first `inserts`
    /// creates collide. Returns the counters of both calls.
    fn mixed_collision_repo(
        checks: usize,
        inserts: usize,
    ) -> (MockUrlRepository, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let exists_calls = Arc::new(AtomicUsize::new(0));
        let create_calls = Arc::new(AtomicUsize::new(0));
        let mut repo = MockUrlRepository::new();

        let seen = exists_calls.clone();
        repo.expect_exists_by_code()
            .returning(move |_| Ok(seen.fetch_add(1, Ordering::SeqCst) < checks));

        let seen = create_calls.clone();
        repo.expect_create().returning(move |n| {
            if seen.fetch_add(1, Ordering::SeqCst) < inserts {
                Err(AppError::CodeExists { code: n.code })
            } else {
                Ok(created_from(n))
            }
        });

        (repo, exists_calls, create_calls)
    }

    #[tokio::test]
    async fn test_shorten_mixed_collisions_below_bound_succeed() {
        let (repo, exists_calls, create_calls) = mixed_collision_repo(5, 4);
        let (service, _rx) = service(repo, cache());

        assert!(service.shorten(ShortenRequest::new("https://example.com")).await.is_ok());
        assert_eq!(exists_calls.load(Ordering::SeqCst), 10);
        assert_eq!(create_calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_shorten_mixed_collisions_share_one_bound() {
        let (repo, exists_calls, create_calls) = mixed_collision_repo(5, 5);
        let (service, _rx) = service(repo, cache());

        let result = service.shorten(ShortenRequest::new("https://example.com")).await;

        assert!(matches!(
            result,
            Err(AppError::GenerationExhausted { attempts: 10 })
        ));
        assert_eq!(exists_calls.load(Ordering::SeqCst), 10);
        assert_eq!(create_calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_shorten_existence_collisions_alone_exhaust_once() {
        let (repo, exists_calls, create_calls) = mixed_collision_repo(usize::MAX, 0);
        let (service, _rx) = service(repo, cache());

        let result = service.shorten(ShortenRequest::new("https://example.com")).await;

        assert!(matches!(result, Err(AppError::GenerationExhausted { .. })));
        assert_eq!(exists_calls.load(Ordering::SeqCst), 10);
        assert_eq!(create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolve_queues_click() {
        let mut repo = MockUrlRepository::new();
        repo.expect_get_active_by_code()
            .withf(|code| code == "abc123")
            .returning(|code| Ok(Some(sample_short_url(5, code, "https://example.com"))));
        let (service, mut rx) = service(repo, cache());

        let metadata = ClickMetadata::new(Some("10.0.0.1".to_string()), Some("curl/8.0"), None);
        let destination = service.resolve("abc123", None, metadata.clone()).await.unwrap();

        assert_eq!(destination, "https://example.com");
        let event = rx.try_recv().unwrap();
        assert_eq!(event.short_url_id, 5);
        assert_eq!(event.code, "abc123");
        assert_eq!(event.metadata, metadata);
    }

    #[tokio::test]
    async fn test_resolve_missing_classifies_gone_and_not_found() {
        let mut repo = MockUrlRepository::new();
        repo.expect_get_active_by_code().returning(|_| Ok(None));
        repo.expect_get_by_code().returning(|code| {
            if code == "expired" {
                let mut record = sample_short_url(1, code, "https://example.com");
                record.active = false;
                Ok(Some(record))
            } else {
                Ok(None)
            }
        });
        let (service, mut rx) = service(repo, cache());

        assert!(matches!(
            service.resolve("expired", None, ClickMetadata::default()).await,
            Err(AppError::Gone)
        ));
        assert!(matches!(
            service.resolve("nothing", None, ClickMetadata::default()).await,
            Err(AppError::NotFound)
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_resolve_invalidates_stale_cache_hit() {
        let mut repo = MockUrlRepository::new();
        repo.expect_get_active_by_code().returning(|_| Ok(None));
        repo.expect_get_by_code().returning(|_| Ok(None));
        let cache = cache();
        cache.put("abc123", "https://stale.example.com", Some(1)).await;
        let (service, _rx) = service(repo, cache.clone());

        let result = service.resolve("abc123", None, ClickMetadata::default()).await;

        assert!(matches!(result, Err(AppError::NotFound)));
        assert!(cache.get("abc123").await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_store_error_is_not_not_found() {
        let mut repo = MockUrlRepository::new();
        repo.expect_get_active_by_code()
            .returning(|_| Err(AppError::store_unavailable("connection refused")));
        let (service, _rx) = service(repo, cache());

        assert!(matches!(
            service.resolve("abc123", None, ClickMetadata::default()).await,
            Err(AppError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_full_queue_still_redirects() {
        let mut repo = MockUrlRepository::new();
        repo.expect_get_active_by_code()
            .returning(|code| Ok(Some(sample_short_url(5, code, "https://example.com"))));
        let (tx, _rx) = mpsc::channel(1);
        let service = ResolutionService::new(Arc::new(repo), CodeSettings::default(), cache(), tx);

        for _ in 0..3 {
            let destination = service
                .resolve("abc123", None, ClickMetadata::default())
                .await
                .unwrap();
            assert_eq!(destination, "https://example.com");
        }

        assert_eq!(service.dropped_clicks(), 2);
    }

    #[tokio::test]
    async fn test_resolve_secret() {
        let stored = hash_secret("abc").unwrap();
        let mut repo = MockUrlRepository::new();
        repo.expect_get_active_by_code().returning(move |code| {
            let mut record = sample_short_url(5, code, "https://example.com");
            record.secret_hash = Some(stored.clone());
            Ok(Some(record))
        });
        let (service, _rx) = service(repo, cache());

        assert!(matches!(
            service.resolve("abc123", None, ClickMetadata::default()).await,
            Err(AppError::Unauthorized { .. })
        ));
        assert!(matches!(
            service.resolve("abc123", Some("wrong"), ClickMetadata::default()).await,
            Err(AppError::Unauthorized { .. })
        ));
        assert_eq!(
            service
                .resolve("abc123", Some("abc"), ClickMetadata::default())
                .await
                .unwrap(),
            "https://example.com"
        );
    }

    #[tokio::test]
    async fn test_update_owner_mismatch() {
        let mut repo = MockUrlRepository::new();
        repo.expect_get_by_id()
            .returning(|id| Ok(Some(sample_short_url(id, "abc123", "https://example.com"))));
        repo.expect_update().never();
        let (service, _rx) = service(repo, cache());

        let patch = ShortUrlPatch {
            active: Some(false),
            ..ShortUrlPatch::default()
        };

        assert!(matches!(
            service.update(1, 2, patch).await,
            Err(AppError::Unauthorized { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_deactivate_invalidates_cache() {
        let mut repo = MockUrlRepository::new();
        repo.expect_get_by_id()
            .returning(|id| Ok(Some(sample_short_url(id, "abc123", "https://example.com"))));
        repo.expect_update()
            .withf(|r| !r.active)
            .returning(|r| Ok(r.clone()));
        let cache = cache();
        cache.put("abc123", "https://example.com", Some(1)).await;
        let (service, _rx) = service(repo, cache.clone());

        let patch = ShortUrlPatch {
            active: Some(false),
            ..ShortUrlPatch::default()
        };
        let updated = service.update(1, 1, patch).await.unwrap();

        assert!(!updated.active);
        assert!(cache.get("abc123").await.is_none());
    }

    #[tokio::test]
    async fn test_update_destination_refreshes_cache() {
        let mut repo = MockUrlRepository::new();
        repo.expect_get_by_id()
            .returning(|id| Ok(Some(sample_short_url(id, "abc123", "https://old.example.com"))));
        repo.expect_update().returning(|r| Ok(r.clone()));
        let cache = cache();
        cache.put("abc123", "https://old.example.com", Some(1)).await;
        let (service, _rx) = service(repo, cache.clone());

        let patch = ShortUrlPatch {
            destination: Some("https://new.example.com".to_string()),
            ..ShortUrlPatch::default()
        };
        service.update(1, 1, patch).await.unwrap();

        assert_eq!(
            cache.get("abc123").await.unwrap().destination,
            "https://new.example.com"
        );
    }

    #[tokio::test]
    async fn test_update_anonymous_record_is_unauthorized() {
        let mut repo = MockUrlRepository::new();
        repo.expect_get_by_id().returning(|id| {
            let mut record = sample_short_url(id, "abc123", "https://example.com");
            record.owner = None;
            Ok(Some(record))
        });
        let (service, _rx) = service(repo, cache());

        assert!(matches!(
            service.update(1, 1, ShortUrlPatch::default()).await,
            Err(AppError::Unauthorized { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_invalidates_cache() {
        let mut repo = MockUrlRepository::new();
        repo.expect_get_by_id()
            .returning(|id| Ok(Some(sample_short_url(id, "abc123", "https://example.com"))));
        repo.expect_soft_delete().with(eq(1)).times(1).returning(|_| Ok(true));
        let cache = cache();
        cache.put("abc123", "https://example.com", Some(1)).await;
        let (service, _rx) = service(repo, cache.clone());

        service.delete(1, 1).await.unwrap();

        assert!(cache.get("abc123").await.is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let mut repo = MockUrlRepository::new();
        repo.expect_get_by_id().returning(|_| Ok(None));
        let (service, _rx) = service(repo, cache());

        assert!(matches!(service.delete(9, 1).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_cleanup_continues_past_failures() {
        let mut repo = MockUrlRepository::new();
        repo.expect_list_expired().with(eq(100)).returning(|_| {
            Ok(vec![
                sample_short_url(1, "aaa111", "https://a.example.com"),
                sample_short_url(2, "bbb222", "https://b.example.com"),
                sample_short_url(3, "ccc333", "https://c.example.com"),
            ])
        });
        repo.expect_deactivate_expired().times(3).returning(|id| {
            if id == 2 {
                Err(AppError::store_unavailable("deadlock"))
            } else {
                Ok(true)
            }
        });
        repo.expect_update().never();
        let cache = cache();
        cache.put("aaa111", "https://a.example.com", Some(1)).await;
        let (service, _rx) = service(repo, cache.clone());

        assert_eq!(service.cleanup_expired().await.unwrap(), 2);
        assert!(cache.get("aaa111").await.is_none());
    }

    #[tokio::test]
    async fn test_cleanup_skips_record_changed_since_listing() {
        let mut repo = MockUrlRepository::new();
        repo.expect_list_expired()
            .returning(|_| Ok(vec![sample_short_url(4, "ddd444", "https://d.example.com")]));
        repo.expect_deactivate_expired()
            .with(eq(4))
            .times(1)
            .returning(|_| Ok(false));
        repo.expect_update().never();
        let cache = cache();
        cache.put("ddd444", "https://new.example.com", Some(1)).await;
        let (service, _rx) = service(repo, cache.clone());

        assert_eq!(service.cleanup_expired().await.unwrap(), 0);
        assert_eq!(
            cache.get("ddd444").await.unwrap().destination,
            "https://new.example.com"
        );
    }
}
