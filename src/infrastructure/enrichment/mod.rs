//! Click enrichment: derives device, browser, OS and location fields from
//! request metadata before a click is persisted.
//!
//! - [`ClickEnricher`] - Enrichment seam used by the click worker
//! - [`UserAgentEnricher`] - User-Agent parsing via `woothee`, no geo lookup

mod user_agent;

pub use user_agent::UserAgentEnricher;

use crate::domain::entities::{ClickEnrichment, ClickMetadata};
use async_trait::async_trait;

/// Turns raw click metadata into enrichment fields.
///
/// Implementations must not fail: anything that cannot be derived is
/// reported as [`crate::domain::entities::click::UNKNOWN`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClickEnricher: Send + Sync {
    async fn enrich(&self, metadata: &ClickMetadata) -> ClickEnrichment;
}
