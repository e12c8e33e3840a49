//! HTTP route configuration.

use axum::{Router, routing::get};
use tower_http::normalize_path::NormalizePathLayer;
use tower::Layer;

use crate::api::handlers::{health_handler, redirect_handler};
use crate::api::middleware;
use crate::domain::repositories::UrlRepository;
use crate::state::AppState;

/// Builds the service router.
///
/// # Endpoints
///
/// - `GET /health` - Component health
/// - `GET /{code}` - Redirect to the destination
///
/// `health` is a reserved code, so the literal route never shadows a link.
pub fn app_router<U: UrlRepository + 'static>(state: AppState<U>) -> Router {
    Router::new()
        .route("/health", get(health_handler::<U>))
        .route("/{code}", get(redirect_handler::<U>))
        .layer(middleware::tracing::layer())
        .with_state(state)
}

/// Wraps the router so trailing slashes are ignored (`/abc123/` → `/abc123`).
pub fn normalized(router: Router) -> tower_http::normalize_path::NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router)
}
