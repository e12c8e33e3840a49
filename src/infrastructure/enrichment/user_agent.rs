use async_trait::async_trait;
use woothee::parser::Parser;

use super::ClickEnricher;
use crate::domain::entities::click::UNKNOWN;
use crate::domain::entities::{ClickEnrichment, ClickMetadata};

/// Marker woothee uses for fields it could not detect.
const WOOTHEE_UNKNOWN: &str = "UNKNOWN";

/// Enricher that parses the User-Agent header.
///
/// Country, region and city stay [`UNKNOWN`]: no geo database is wired in.
pub struct UserAgentEnricher {
    parser: Parser,
}

impl UserAgentEnricher {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    fn parse(&self, user_agent: &str) -> ClickEnrichment {
        let Some(result) = self.parser.parse(user_agent) else {
            return ClickEnrichment::default();
        };

        ClickEnrichment {
            device: known_or_unknown(&result.category),
            browser: known_or_unknown(&result.name),
            os: known_or_unknown(&result.os),
            ..ClickEnrichment::default()
        }
    }
}

impl Default for UserAgentEnricher {
    fn default() -> Self {
        Self::new()
    }
}

fn known_or_unknown(value: &str) -> String {
    if value.is_empty() || value == WOOTHEE_UNKNOWN {
        UNKNOWN.to_string()
    } else {
        value.to_string()
    }
}

#[async_trait]
impl ClickEnricher for UserAgentEnricher {
    async fn enrich(&self, metadata: &ClickMetadata) -> ClickEnrichment {
        match metadata.user_agent.as_deref() {
            Some(ua) if !ua.trim().is_empty() => self.parse(ua),
            _ => ClickEnrichment::default(),
        }
    }
}
