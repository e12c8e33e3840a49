//! PostgreSQL repository implementations.
//!
//! Concrete implementations of domain repository traits using SQLx prepared
//! statements. Schema lives in `migrations/`.
//!
//! # Repositories
//!
//! - [`PgUrlRepository`] - Short URL storage, liveness lookups and expiry scans
//! - [`PgClickRepository`] - Click event persistence

pub mod pg_click_repository;
pub mod pg_url_repository;

pub use pg_click_repository::PgClickRepository;
pub use pg_url_repository::PgUrlRepository;
