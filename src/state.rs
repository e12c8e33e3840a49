//! Shared state handed to every HTTP handler.

use std::sync::Arc;

use crate::application::services::ResolutionService;
use crate::domain::repositories::UrlRepository;
use crate::infrastructure::persistence::PgUrlRepository;

/// Application state cloned into each request.
///
/// Generic over the URL store so handlers can be exercised against an
/// in-memory repository; production uses [`PgUrlRepository`].
pub struct AppState<U: UrlRepository = PgUrlRepository> {
    pub service: Arc<ResolutionService<U>>,
    /// Trust `X-Forwarded-For` / `X-Real-IP` when extracting the click IP.
    pub behind_proxy: bool,
}

impl<U: UrlRepository> AppState<U> {
    pub fn new(service: Arc<ResolutionService<U>>, behind_proxy: bool) -> Self {
        Self {
            service,
            behind_proxy,
        }
    }
}

impl<U: UrlRepository> Clone for AppState<U> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            behind_proxy: self.behind_proxy,
        }
    }
}
