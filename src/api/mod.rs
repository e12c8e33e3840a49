//! HTTP edge for the redirect hot path.
//!
//! # Modules
//!
//! - [`dto`] - Request/response shapes
//! - [`handlers`] - HTTP request handlers
//! - [`middleware`] - Request tracing
//! - [`routes`] - Route configuration

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
