//! Query parameters accepted by the redirect endpoint.

use serde::Deserialize;

/// `GET /{code}?secret=...`
///
/// `password` is accepted as an alias for older links.
#[derive(Debug, Default, Deserialize)]
pub struct RedirectQuery {
    #[serde(alias = "password")]
    pub secret: Option<String>,
}
