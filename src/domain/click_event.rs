//! Click event model for asynchronous click tracking.

use chrono::{DateTime, Utc};

use crate::domain::entities::ClickMetadata;

/// An in-memory representation of a click awaiting persistence.
///
/// Created by [`crate::application::services::ResolutionService::resolve`]
/// once the redirect decision is made, and sent to the background worker over
/// a bounded channel. The redirect response never waits for it.
///
/// # Usage Flow
///
/// 1. Built from the resolved record and the request metadata
/// 2. Sent to channel with `try_send` (non-blocking)
/// 3. Processed by [`crate::application::click_worker::run_click_worker`]
/// 4. Enriched and persisted through [`crate::application::services::ClickRecorder`]
#[derive(Debug, Clone)]
pub struct ClickEvent {
    pub short_url_id: i64,
    pub code: String,
    pub metadata: ClickMetadata,
    pub clicked_at: DateTime<Utc>,
}

impl ClickEvent {
    /// Creates a click event stamped with the current time.
    pub fn new(short_url_id: i64, code: String, metadata: ClickMetadata) -> Self {
        Self {
            short_url_id,
            code,
            metadata,
            clicked_at: Utc::now(),
        }
    }
}
