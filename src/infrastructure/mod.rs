//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete implementations for data persistence, caching and click
//! enrichment.
//!
//! # Modules
//!
//! - [`cache`] - Resolution cache (Redis and in-process backends)
//! - [`enrichment`] - Click metadata enrichment
//! - [`persistence`] - PostgreSQL repository implementations

pub mod cache;
pub mod enrichment;
pub mod persistence;
