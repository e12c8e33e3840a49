//! CLI administration tool for url-resolver.
//!
//! Runs the same services as the HTTP server, so every mutation goes through
//! the owner checks and cache invalidation of the resolution service.
//!
//! # Usage
//!
//! ```bash
//! # Create a short URL
//! cargo run --bin admin -- shorten https://example.com --owner 1 --alias meeting
//!
//! # Inspect a code
//! cargo run --bin admin -- show meeting
//!
//! # Deactivate it
//! cargo run --bin admin -- update 42 --owner 1 --deactivate
//!
//! # Soft-delete it
//! cargo run --bin admin -- delete 42 --owner 1
//!
//! # Deactivate expired links (for cron or another external scheduler)
//! cargo run --bin admin -- cleanup
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! Same as the server (see [`url_resolver::config`]); `DATABASE_URL` is required
//! and `REDIS_URL` should match the server so invalidations reach its cache.

use url_resolver::application::services::{ResolutionService, ShortenRequest};
use url_resolver::config::{self, Config};
use url_resolver::domain::entities::ShortUrlPatch;
use url_resolver::domain::repositories::{ClickRepository, UrlRepository};
use url_resolver::infrastructure::cache::ResolutionCache;
use url_resolver::infrastructure::persistence::{PgClickRepository, PgUrlRepository};
use url_resolver::server::{build_cache_backend, build_service, connect_pool};

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing url-resolver.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level commands.
#[derive(Subcommand)]
enum Commands {
    /// Create a short URL
    Shorten {
        /// Destination URL (http or https)
        destination: String,

        /// Custom alias (3-20 letters or digits)
        #[arg(short, long)]
        alias: Option<String>,

        /// Owner identifier
        #[arg(short, long)]
        owner: Option<i64>,

        /// Secret required to follow the link
        #[arg(short, long)]
        secret: Option<String>,

        /// Expire the link after this many hours
        #[arg(short, long)]
        expires_in_hours: Option<i64>,
    },

    /// Show a short URL by code
    Show {
        code: String,
    },

    /// Update a short URL
    Update {
        id: i64,

        #[arg(short, long)]
        owner: i64,

        /// New destination URL
        #[arg(short, long)]
        destination: Option<String>,

        #[arg(long, conflicts_with = "deactivate")]
        activate: bool,

        #[arg(long)]
        deactivate: bool,

        /// Expire the link this many hours from now
        #[arg(short, long, conflicts_with = "no_expiry")]
        expires_in_hours: Option<i64>,

        /// Remove the expiry
        #[arg(long)]
        no_expiry: bool,

        /// Set a new secret
        #[arg(short, long, conflicts_with = "clear_secret")]
        secret: Option<String>,

        /// Remove the secret
        #[arg(long)]
        clear_secret: bool,
    },

    /// Soft-delete a short URL
    Delete {
        id: i64,

        #[arg(short, long)]
        owner: i64,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Deactivate one batch of expired short URLs
    Cleanup,

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::load_from_env()?;

    let pool = connect_pool(&config).await?;

    match cli.command {
        Commands::Db { action } => handle_db_action(action, &pool).await,
        Commands::Show { code } => show(&pool, &code).await,
        command => {
            let cache =
                ResolutionCache::new(build_cache_backend(&config).await, config.cache_timeout());
            let (service, worker) = build_service(&config, Arc::new(pool), cache);

            let result = run_command(command, &service, &config).await;

            drop(service);
            let _ = worker.await;
            result
        }
    }
}

async fn run_command(
    command: Commands,
    service: &ResolutionService<PgUrlRepository>,
    config: &Config,
) -> Result<()> {
    match command {
        Commands::Shorten {
            destination,
            alias,
            owner,
            secret,
            expires_in_hours,
        } => {
            let request = ShortenRequest {
                destination,
                owner,
                custom_alias: alias,
                secret,
                expires_at: expires_in_hours.map(|h| Utc::now() + Duration::hours(h)),
            };
            shorten(service, request).await
        }
        Commands::Update {
            id,
            owner,
            destination,
            activate,
            deactivate,
            expires_in_hours,
            no_expiry,
            secret,
            clear_secret,
        } => {
            let patch = ShortUrlPatch {
                destination,
                active: match (activate, deactivate) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
                expires_at: match (expires_in_hours, no_expiry) {
                    (Some(h), _) => Some(Some(Utc::now() + Duration::hours(h))),
                    (None, true) => Some(None),
                    (None, false) => None,
                },
                secret: match (secret, clear_secret) {
                    (Some(s), _) => Some(Some(s)),
                    (None, true) => Some(None),
                    (None, false) => None,
                },
            };
            update(service, id, owner, patch).await
        }
        Commands::Delete { id, owner, yes } => delete(service, id, owner, yes).await,
        Commands::Cleanup => cleanup(service, config).await,
        Commands::Show { .. } | Commands::Db { .. } => Ok(()),
    }
}

async fn shorten(
    service: &ResolutionService<PgUrlRepository>,
    request: ShortenRequest,
) -> Result<()> {
    println!("{}", "🔗 Create Short URL".bright_blue().bold());
    println!();

    let record = service
        .shorten(request)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create short URL: {}", e))?;

    println!("{}", "✅ Short URL created".green().bold());
    println!("  ID:          {}", record.id.to_string().bright_black());
    println!("  Code:        {}", record.code.bright_yellow().bold());
    println!("  Destination: {}", record.destination.cyan());
    if let Some(expires_at) = record.expires_at {
        println!(
            "  Expires:     {}",
            expires_at.format("%Y-%m-%d %H:%M UTC").to_string()
        );
    }
    if record.has_secret() {
        println!("  {}", "🔒 Secret required".yellow());
    }
    println!();

    Ok(())
}

/// Prints one record with its status and recorded clicks.
async fn show(pool: &PgPool, code: &str) -> Result<()> {
    let pool = Arc::new(pool.clone());
    let urls = PgUrlRepository::new(pool.clone());
    let clicks = PgClickRepository::new(pool);

    let record = urls
        .get_by_code(code)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?
        .context("Short URL not found")?;

    let click_rows = clicks
        .count_by_short_url(record.id)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?;

    let status = if record.is_accessible() {
        "ACTIVE".green()
    } else if record.is_expired() {
        "EXPIRED".yellow()
    } else {
        "INACTIVE".red()
    };

    println!("{}", "🔎 Short URL".bright_blue().bold());
    println!();
    println!("  ID:          {}", record.id.to_string().bright_black());
    println!("  Code:        {}", record.code.bright_yellow().bold());
    println!("  Destination: {}", record.destination.cyan());
    println!(
        "  Owner:       {}",
        record
            .owner
            .map_or_else(|| "-".to_string(), |o| o.to_string())
    );
    println!("  Status:      {}", status);
    println!(
        "  Expires:     {}",
        record.expires_at.map_or_else(
            || "never".to_string(),
            |e| e.format("%Y-%m-%d %H:%M UTC").to_string()
        )
    );
    println!("  Secret:      {}", if record.has_secret() { "yes" } else { "no" });
    println!(
        "  Clicks:      {} (rows: {})",
        record.click_count.to_string().bright_green().bold(),
        click_rows
    );
    println!(
        "  Created:     {}",
        record.created_at.format("%Y-%m-%d %H:%M").to_string().bright_black()
    );
    println!();

    Ok(())
}

async fn update(
    service: &ResolutionService<PgUrlRepository>,
    id: i64,
    owner: i64,
    patch: ShortUrlPatch,
) -> Result<()> {
    if patch.is_empty() {
        println!("{}", "⚠️  Nothing to update".yellow());
        return Ok(());
    }

    let record = service
        .update(id, owner, patch)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to update short URL: {}", e))?;

    println!("{}", "✅ Short URL updated".green().bold());
    println!("  Code:        {}", record.code.bright_yellow());
    println!("  Destination: {}", record.destination.cyan());
    println!(
        "  Active:      {}",
        if record.active { "yes".green() } else { "no".red() }
    );
    println!();

    Ok(())
}

/// Soft-deletes a record after confirmation (default: No).
async fn delete(
    service: &ResolutionService<PgUrlRepository>,
    id: i64,
    owner: i64,
    skip_confirm: bool,
) -> Result<()> {
    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete short URL {id}?"))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    service
        .delete(id, owner)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to delete short URL: {}", e))?;

    println!("{}", "✅ Short URL deleted".green().bold());
    Ok(())
}

async fn cleanup(service: &ResolutionService<PgUrlRepository>, config: &Config) -> Result<()> {
    println!("{}", "🧹 Deactivating expired short URLs...".bright_blue());

    let deactivated = service
        .cleanup_expired()
        .await
        .map_err(|e| anyhow::anyhow!("Cleanup failed: {}", e))?;

    println!(
        "{} {} (batch size {})",
        "✅ Deactivated:".green().bold(),
        deactivated.to_string().bright_white().bold(),
        config.cleanup_batch_size
    );

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            let live: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM short_urls WHERE deleted_at IS NULL")
                    .fetch_one(pool)
                    .await?;

            let clicks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clicks")
                .fetch_one(pool)
                .await?;

            println!("  PostgreSQL: {}", version.bright_white());
            println!("  Short URLs: {}", live.to_string().bright_green().bold());
            println!("  Clicks:     {}", clicks.to_string().bright_green().bold());
            println!();
        }
    }

    Ok(())
}
