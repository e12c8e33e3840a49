#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::ConnectInfo;
use axum_test::TestServer;
use chrono::Utc;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tower::Layer;
use url_resolver::AppState;
use url_resolver::api::routes::app_router;
use url_resolver::application::services::{CodeSettings, ResolutionService};
use url_resolver::domain::click_event::ClickEvent;
use url_resolver::domain::entities::{Click, NewClick, NewShortUrl, ShortUrl};
use url_resolver::domain::repositories::{ClickRepository, UrlRepository};
use url_resolver::error::AppError;
use url_resolver::infrastructure::cache::{DEFAULT_CACHE_TIMEOUT, MemoryCache, ResolutionCache};

/// In-memory URL store with the same uniqueness and liveness rules as the
/// PostgreSQL repository, plus knobs for forcing collisions.
#[derive(Default)]
pub struct InMemoryUrlRepository {
    records: Mutex<Vec<ShortUrl>>,
    next_id: AtomicI64,
    /// Number of upcoming `exists_by_code` calls that report a collision.
    exists_collisions: AtomicUsize,
    /// When set, the first insert for every distinct destination fails with
    /// `CodeExists`, as if another writer took the code first.
    collide_first_insert: bool,
    collided_destinations: Mutex<HashSet<String>>,
}

impl InMemoryUrlRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exists_collisions(collisions: usize) -> Self {
        let repo = Self::default();
        repo.exists_collisions.store(collisions, Ordering::SeqCst);
        repo
    }

    pub fn colliding_on_first_insert() -> Self {
        Self {
            collide_first_insert: true,
            ..Self::default()
        }
    }

    /// Inserts a record as-is, bypassing service validation.
    pub fn insert_raw(&self, mut record: ShortUrl) -> ShortUrl {
        record.id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.records.lock().unwrap().push(record.clone());
        record
    }

    pub fn find(&self, id: i64) -> Option<ShortUrl> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub fn live_codes(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.deleted_at.is_none())
            .map(|r| r.code.clone())
            .collect()
    }
}

#[async_trait]
impl UrlRepository for InMemoryUrlRepository {
    async fn create(&self, new_url: NewShortUrl) -> Result<ShortUrl, AppError> {
        if self.collide_first_insert
            && self
                .collided_destinations
                .lock()
                .unwrap()
                .insert(new_url.destination.clone())
        {
            return Err(AppError::CodeExists { code: new_url.code });
        }

        let mut records = self.records.lock().unwrap();
        if records
            .iter()
            .any(|r| r.deleted_at.is_none() && r.code == new_url.code)
        {
            return Err(AppError::CodeExists { code: new_url.code });
        }

        let now = Utc::now();
        let record = ShortUrl {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            code: new_url.code,
            destination: new_url.destination,
            owner: new_url.owner,
            secret_hash: new_url.secret_hash,
            custom_alias: new_url.custom_alias,
            expires_at: new_url.expires_at,
            active: true,
            click_count: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ShortUrl>, AppError> {
        Ok(self.find(id).filter(|r| r.deleted_at.is_none()))
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<ShortUrl>, AppError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.code == code && r.deleted_at.is_none())
            .cloned())
    }

    async fn get_active_by_code(&self, code: &str) -> Result<Option<ShortUrl>, AppError> {
        Ok(self
            .get_by_code(code)
            .await?
            .filter(|r| r.active && !r.is_expired()))
    }

    async fn update(&self, url: &ShortUrl) -> Result<ShortUrl, AppError> {
        let mut records = self.records.lock().unwrap();
        let stored = records
            .iter_mut()
            .find(|r| r.id == url.id && r.deleted_at.is_none())
            .ok_or(AppError::NotFound)?;

        stored.code = url.code.clone();
        stored.destination = url.destination.clone();
        stored.secret_hash = url.secret_hash.clone();
        stored.expires_at = url.expires_at;
        stored.active = url.active;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, AppError> {
        let mut records = self.records.lock().unwrap();
        match records
            .iter_mut()
            .find(|r| r.id == id && r.deleted_at.is_none())
        {
            Some(record) => {
                record.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn increment_click_count(&self, id: i64) -> Result<(), AppError> {
        if let Some(record) = self
            .records
            .lock()
            .unwrap()
            .iter_mut()
            .find(|r| r.id == id)
        {
            record.click_count += 1;
        }
        Ok(())
    }

    async fn list_expired(&self, limit: i64) -> Result<Vec<ShortUrl>, AppError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.deleted_at.is_none() && r.active && r.is_expired())
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn deactivate_expired(&self, id: i64) -> Result<bool, AppError> {
        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|r| {
            r.id == id && r.deleted_at.is_none() && r.active && r.is_expired()
        }) {
            Some(record) => {
                record.active = false;
                record.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool, AppError> {
        let forced = self
            .exists_collisions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if forced {
            return Ok(true);
        }

        let exists = self.get_by_code(code).await?.is_some();

        // Give concurrent generators a chance to pass the same check.
        tokio::task::yield_now().await;

        Ok(exists)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// In-memory click store.
#[derive(Default)]
pub struct InMemoryClickRepository {
    clicks: Mutex<Vec<Click>>,
}

impl InMemoryClickRepository {
    pub fn all(&self) -> Vec<Click> {
        self.clicks.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClickRepository for InMemoryClickRepository {
    async fn create(&self, new_click: NewClick) -> Result<Click, AppError> {
        let mut clicks = self.clicks.lock().unwrap();
        let click = Click {
            id: clicks.len() as i64 + 1,
            short_url_id: new_click.short_url_id,
            ip_address: new_click.metadata.ip_address,
            user_agent: new_click.metadata.user_agent,
            referer: new_click.metadata.referer,
            enrichment: new_click.enrichment,
            clicked_at: new_click.clicked_at,
        };
        clicks.push(click.clone());
        Ok(click)
    }

    async fn count_by_short_url(&self, short_url_id: i64) -> Result<i64, AppError> {
        Ok(self
            .clicks
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.short_url_id == short_url_id)
            .count() as i64)
    }
}

pub fn memory_cache() -> ResolutionCache {
    ResolutionCache::new(Arc::new(MemoryCache::default()), DEFAULT_CACHE_TIMEOUT)
}

/// Builds a service over `repo` with default code settings and a fresh
/// in-memory cache. The receiver must be kept alive for clicks to queue.
pub fn create_test_service(
    repo: Arc<InMemoryUrlRepository>,
    settings: CodeSettings,
) -> (
    Arc<ResolutionService<InMemoryUrlRepository>>,
    ResolutionCache,
    mpsc::Receiver<ClickEvent>,
) {
    let cache = memory_cache();
    let (tx, rx) = mpsc::channel(1_000);
    let service = ResolutionService::new(repo, settings, cache.clone(), tx);
    (Arc::new(service), cache, rx)
}

/// Peer address injected by [`MockConnectInfoLayer`].
pub const PEER_IP: &str = "127.0.0.1";

/// Supplies `ConnectInfo` to handlers when the router is not served by a real
/// listener.
#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = format!("{PEER_IP}:12345").parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}

/// Serves the full router over `service`.
pub fn create_test_server(
    service: Arc<ResolutionService<InMemoryUrlRepository>>,
    behind_proxy: bool,
) -> TestServer {
    let state = AppState::new(service, behind_proxy);
    let app = app_router(state).layer(MockConnectInfoLayer);

    TestServer::new(app).unwrap()
}
