//! Domain layer containing business entities and repository contracts.
//!
//! The domain layer has no dependencies on infrastructure or presentation
//! layers. Business logic lives in [`crate::application::services`].
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`click_event`] - Click tracking event model
//!
//! # Click Processing Flow
//!
//! 1. The resolution service decides the redirect
//! 2. A [`click_event::ClickEvent`] is sent to an async channel
//! 3. [`crate::application::click_worker::run_click_worker`] enriches and records it
//! 4. Click data is persisted via [`repositories::ClickRepository`]

pub mod click_event;
pub mod entities;
pub mod repositories;
