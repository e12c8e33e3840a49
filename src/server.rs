//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, cache setup, worker spawning, the optional
//! expiry sweep and the Axum server lifecycle.

use crate::api::routes::{app_router, normalized};
use crate::application::click_worker::run_click_worker;
use crate::application::services::{ClickRecorder, ResolutionService};
use crate::config::Config;
use crate::domain::repositories::UrlRepository;
use crate::infrastructure::cache::{CacheService, MemoryCache, RedisCache, ResolutionCache};
use crate::infrastructure::enrichment::UserAgentEnricher;
use crate::infrastructure::persistence::{PgClickRepository, PgUrlRepository};
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// How long shutdown waits for the click worker to drain.
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens the PostgreSQL pool with the configured limits.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn connect_pool(config: &Config) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")
}

/// Picks the cache backend: Redis when configured and reachable, otherwise
/// the in-process cache.
pub async fn build_cache_backend(config: &Config) -> Arc<dyn CacheService> {
    let ttls = config.cache_ttls();

    let Some(redis_url) = &config.redis_url else {
        tracing::info!("Cache: in-process (Redis not configured)");
        return Arc::new(MemoryCache::new(ttls));
    };

    match RedisCache::connect(redis_url, ttls).await {
        Ok(redis) => {
            tracing::info!("Cache: Redis");
            Arc::new(redis)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to connect to Redis, using in-process cache");
            Arc::new(MemoryCache::new(ttls))
        }
    }
}

/// Builds the resolution service over PostgreSQL and spawns the click worker.
///
/// The worker stops once the returned service (the only holder of the click
/// sender) and every clone of it are dropped.
pub fn build_service(
    config: &Config,
    pool: Arc<PgPool>,
    cache: ResolutionCache,
) -> (
    Arc<ResolutionService<PgUrlRepository>>,
    tokio::task::JoinHandle<()>,
) {
    let url_repository = Arc::new(PgUrlRepository::new(pool.clone()));
    let click_repository = Arc::new(PgClickRepository::new(pool));

    let (click_tx, click_rx) = mpsc::channel(config.click_queue_capacity);

    let recorder = ClickRecorder::new(
        url_repository.clone(),
        click_repository,
        cache.clone(),
        config.click_retry_policy(),
    )
    .with_store_timeout(config.store_timeout());

    let worker = tokio::spawn(run_click_worker(
        click_rx,
        Arc::new(recorder),
        Arc::new(UserAgentEnricher::new()),
        config.click_worker_concurrency,
    ));

    let service = ResolutionService::new(url_repository, config.code_settings(), cache, click_tx)
        .with_store_timeout(config.store_timeout())
        .with_cleanup_batch_size(config.cleanup_batch_size);

    (Arc::new(service), worker)
}

/// Runs `cleanup_expired` every `every` until `shutdown` flips to true.
pub async fn run_cleanup_loop<U: UrlRepository>(
    service: Arc<ResolutionService<U>>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = service.cleanup_expired().await {
                    tracing::error!(error = %e, "Expiry sweep failed");
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    tracing::info!("Expiry sweep stopped");
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool
/// - Apply migrations
/// - Redis cache (or in-process fallback)
/// - Background click worker
/// - Optional expiry sweep
/// - Axum HTTP server with graceful shutdown
///
/// On shutdown the click worker drains queued clicks before this returns.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = connect_pool(&config).await?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let backend = build_cache_backend(&config).await;
    let cache = ResolutionCache::new(backend, config.cache_timeout());

    let (service, worker) = build_service(&config, Arc::new(pool), cache);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = config.cleanup_interval().map(|every| {
        tracing::info!(every_secs = every.as_secs(), "Expiry sweep enabled");
        tokio::spawn(run_cleanup_loop(service.clone(), every, shutdown_rx))
    });

    let app = normalized(app_router(AppState::new(
        service.clone(),
        config.behind_proxy,
    )));

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    let _ = shutdown_tx.send(true);
    if let Some(sweeper) = sweeper {
        let _ = sweeper.await;
    }

    drop(service);
    match tokio::time::timeout(WORKER_DRAIN_TIMEOUT, worker).await {
        Ok(_) => tracing::info!("Click queue drained"),
        Err(_) => tracing::warn!("Click worker did not drain in time, pending clicks lost"),
    }

    Ok(())
}
