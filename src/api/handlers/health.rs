//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::domain::repositories::UrlRepository;
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: One or more components degraded
///
/// # Components Checked
///
/// 1. **Database**: store ping within the store deadline
/// 2. **Cache**: backend health check within the cache deadline
/// 3. **Click Queue**: channel open, remaining capacity, dropped clicks
///
/// A failing cache degrades the status even though redirects keep working
/// without it.
pub async fn health_handler<U: UrlRepository + 'static>(
    State(state): State<AppState<U>>,
) -> (StatusCode, Json<HealthResponse>) {
    let service = &state.service;

    let database = if service.store_healthy().await {
        CheckStatus::ok("Connected")
    } else {
        CheckStatus::error("Store unreachable")
    };

    let cache_backend = service.cache().backend_name();
    let cache = if service.cache().health_check().await {
        CheckStatus::ok(format!("{cache_backend} connected"))
    } else {
        CheckStatus::error(format!("{cache_backend} unreachable"))
    };

    let click_queue = match service.click_queue_capacity() {
        Some(capacity) => CheckStatus::ok(format!(
            "Capacity: {capacity}, dropped: {}",
            service.dropped_clicks()
        )),
        None => CheckStatus::error("Click queue is closed"),
    };

    let healthy = database.is_ok() && cache.is_ok() && click_queue.is_ok();

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        checks: HealthChecks {
            database,
            cache,
            click_queue,
        },
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
