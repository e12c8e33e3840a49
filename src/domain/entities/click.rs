//! Click entity representing a single recorded redirect.

use chrono::{DateTime, Utc};

/// Value used for enrichment fields when a lookup yields nothing.
pub const UNKNOWN: &str = "unknown";

/// Raw request metadata captured at redirect time.
///
/// All fields are optional to handle missing headers gracefully.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClickMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

impl ClickMetadata {
    pub fn new(ip_address: Option<String>, user_agent: Option<&str>, referer: Option<&str>) -> Self {
        Self {
            ip_address,
            user_agent: user_agent.map(|s| s.to_string()),
            referer: referer.map(|s| s.to_string()),
        }
    }
}

/// Fields derived from the client IP and User-Agent.
///
/// Produced by a [`crate::infrastructure::enrichment::ClickEnricher`]; any
/// field may be [`UNKNOWN`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClickEnrichment {
    pub country: String,
    pub region: String,
    pub city: String,
    pub device: String,
    pub browser: String,
    pub os: String,
}

impl Default for ClickEnrichment {
    fn default() -> Self {
        Self {
            country: UNKNOWN.to_string(),
            region: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
            device: UNKNOWN.to_string(),
            browser: UNKNOWN.to_string(),
            os: UNKNOWN.to_string(),
        }
    }
}

/// A persisted click. Never mutated after insertion.
#[derive(Debug, Clone)]
pub struct Click {
    pub id: i64,
    pub short_url_id: i64,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub enrichment: ClickEnrichment,
    pub clicked_at: DateTime<Utc>,
}

/// Input data for recording a new click.
///
/// `short_url_id` must reference an existing short URL.
#[derive(Debug, Clone)]
pub struct NewClick {
    pub short_url_id: i64,
    pub metadata: ClickMetadata,
    pub enrichment: ClickEnrichment,
    pub clicked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_metadata_creation_full() {
        let metadata = ClickMetadata::new(
            Some("192.168.1.1".to_string()),
            Some("Mozilla/5.0"),
            Some("https://google.com"),
        );

        assert_eq!(metadata.ip_address, Some("192.168.1.1".to_string()));
        assert_eq!(metadata.user_agent, Some("Mozilla/5.0".to_string()));
        assert_eq!(metadata.referer, Some("https://google.com".to_string()));
    }

    #[test]
    fn test_click_metadata_creation_minimal() {
        let metadata = ClickMetadata::new(None, None, None);

        assert_eq!(metadata, ClickMetadata::default());
    }

    #[test]
    fn test_default_enrichment_is_unknown() {
        let enrichment = ClickEnrichment::default();

        assert_eq!(enrichment.country, UNKNOWN);
        assert_eq!(enrichment.city, UNKNOWN);
        assert_eq!(enrichment.browser, UNKNOWN);
        assert_eq!(enrichment.os, UNKNOWN);
    }
}
