//! Application layer services implementing business logic.
//!
//! This layer orchestrates domain operations by coordinating repository calls,
//! cache access and business rules. Services consume repository traits and
//! provide a clean API for HTTP handlers and the admin CLI.
//!
//! # Available Services
//!
//! - [`services::ResolutionService`] - Shorten, resolve, update, delete, expiry cleanup
//! - [`services::CodeGenerator`] - Custom alias validation and random codes
//! - [`services::ClickRecorder`] - Click persistence and unique-visitor tracking
//!
//! [`click_worker`] runs the background consumer of queued click events.

pub mod click_worker;
pub mod services;
